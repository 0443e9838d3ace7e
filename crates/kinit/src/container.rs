//! # Container
//!
//! The container is a registry of [`Constructor`]s and [`Processor`]s plus the
//! resolver that turns a functor's parameter list into live objects.
//!
//! ## Resolution
//!
//! For each requested type, in parameter order:
//!
//! 1. Reuse the object if the arena (or a live parent) already has one.
//! 2. Otherwise resolve the constructor's own parameters, depth-first.
//! 3. Create the object, then run every processor attached to its type,
//!    resolving each processor's parameters first.
//! 4. Cache the object in the arena together with its destructor.
//!
//! Each type is therefore built at most once per arena. The first error stops
//! the current functor chain; objects built so far stay registered and are
//! torn down when the arena is finalized. An object that was created but could
//! not be processed or cached is destroyed on the spot.
//!
//! The resolver tracks the current resolution path, so a constructor cycle
//! fails with [`Error::Cyclic`] instead of exhausting the stack. Use the
//! [`Inspector`](crate::Inspector) to find cycles and missing constructors
//! before running anything.

use crate::arena::Arena;
use crate::contract::{Constructor, Functor, Processor};
use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};
use crate::runtime::Runtime;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace, warn};

/// A dependency injection container.
///
/// `Container` is a handle: clones share one registry. Registration is
/// write-once per constructor type and the registry is never locked while
/// user code runs.
#[derive(Clone, Default)]
pub struct Container {
    registry: Arc<RwLock<Registry>>,
}

#[derive(Default)]
struct Registry {
    constructors: BTreeMap<TypeKey, Arc<dyn Constructor>>,
    processors: BTreeMap<TypeKey, Vec<Arc<dyn Processor>>>,
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor. Only one constructor per type is allowed.
    pub fn provide<C>(&self, constructor: C) -> Result<(), Error>
    where
        C: Constructor + 'static,
    {
        self.provide_shared(Arc::new(constructor))
    }

    /// Registers an already shared constructor.
    pub fn provide_shared(&self, constructor: Arc<dyn Constructor>) -> Result<(), Error> {
        let key = constructor.type_key();
        if key.is_nil() {
            return Err(Error::Invalid(
                "container cannot register constructor for nil type".into(),
            ));
        }
        let mut registry = self.write();
        if registry.constructors.contains_key(&key) {
            return Err(Error::Ambiguous(format!("{key} constructor already registered")));
        }
        registry.constructors.insert(key, constructor);
        debug!(object = %key.short_name(), "Constructor provided");
        Ok(())
    }

    /// Panicking variant of [`Container::provide`].
    pub fn must_provide<C>(&self, constructor: C)
    where
        C: Constructor + 'static,
    {
        if let Err(e) = self.provide(constructor) {
            panic!("{e}");
        }
    }

    /// Attaches a processor. Any number of processors may target one type,
    /// with or without a constructor for it.
    pub fn attach<P>(&self, processor: P) -> Result<(), Error>
    where
        P: Processor + 'static,
    {
        self.attach_shared(Arc::new(processor))
    }

    pub fn attach_shared(&self, processor: Arc<dyn Processor>) -> Result<(), Error> {
        let key = processor.type_key();
        if key.is_nil() {
            return Err(Error::Invalid(
                "container cannot register processor for nil type".into(),
            ));
        }
        let mut registry = self.write();
        let attached = registry.processors.entry(key).or_default();
        attached.push(processor);
        debug!(object = %key.short_name(), count = attached.len(), "Processor attached");
        Ok(())
    }

    /// Panicking variant of [`Container::attach`].
    pub fn must_attach<P>(&self, processor: P)
    where
        P: Processor + 'static,
    {
        if let Err(e) = self.attach(processor) {
            panic!("{e}");
        }
    }

    /// Returns the constructor and a copy of the processor list for `key`.
    pub fn lookup(&self, key: TypeKey) -> (Option<Arc<dyn Constructor>>, Vec<Arc<dyn Processor>>) {
        let registry = self.read();
        (
            registry.constructors.get(&key).cloned(),
            registry.processors.get(&key).cloned().unwrap_or_default(),
        )
    }

    /// Visits every type that has a constructor or at least one processor,
    /// ordered by type name. The visitor returns `false` to stop early.
    ///
    /// The visitor runs on a snapshot, so it may call back into the container.
    pub fn explore<F>(&self, mut visitor: F)
    where
        F: FnMut(TypeKey, Option<&Arc<dyn Constructor>>, &[Arc<dyn Processor>]) -> bool,
    {
        let snapshot: Vec<_> = {
            let registry = self.read();
            let keys: BTreeSet<TypeKey> = registry
                .constructors
                .keys()
                .chain(registry.processors.keys())
                .copied()
                .collect();
            keys.into_iter()
                .map(|key| {
                    (
                        key,
                        registry.constructors.get(&key).cloned(),
                        registry.processors.get(&key).cloned().unwrap_or_default(),
                    )
                })
                .collect()
        };
        for (key, constructor, processors) in snapshot {
            if !visitor(key, constructor.as_ref(), &processors) {
                break;
            }
        }
    }

    /// Runs `functors` in order against a fresh arena, then finalizes it.
    ///
    /// The arena always starts with a [`Runtime`] bound to this container, so
    /// functors can depend on it to register objects or start nested runs.
    /// The arena is finalized whether the run succeeds, fails or unwinds; a
    /// finalization error is joined with the run's error.
    pub fn run<I>(&self, functors: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        info!("Run started");
        let result = self.run_in(Arena::new(), functors);
        match &result {
            Ok(()) => info!("Run completed"),
            Err(e) => warn!(error = %e, "Run failed"),
        }
        result
    }

    /// Panicking variant of [`Container::run`].
    pub fn must_run<I>(&self, functors: I)
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        if let Err(e) = self.run(functors) {
            panic!("{e}");
        }
    }

    /// Runs `functors` in `arena` and finalizes it afterwards.
    pub(crate) fn run_in<I>(&self, arena: Arena, functors: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        let guard = FinalizeOnUnwind { arena: &arena };
        let outcome = self.execute_all(&arena, functors);
        let finalized = arena.finalize();
        drop(guard);
        Error::join(outcome, finalized)
    }

    fn execute_all<I>(&self, arena: &Arena, functors: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        let runtime: Object = Rc::new(Runtime::new(self, arena));
        arena.put(TypeKey::of::<Runtime>(), runtime, Destructor::noop())?;
        let mut resolver = Resolver::new(self, arena);
        for functor in functors {
            resolver.execute(functor.as_ref())?;
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.read();
        f.debug_struct("Container")
            .field("constructors", &registry.constructors.keys().collect::<Vec<_>>())
            .field("processors", &registry.processors.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Finalizes the arena if the run unwinds before reaching its own
/// finalization.
struct FinalizeOnUnwind<'a> {
    arena: &'a Arena,
}

impl Drop for FinalizeOnUnwind<'_> {
    fn drop(&mut self) {
        if self.arena.is_finalized() {
            return;
        }
        if let Err(e) = self.arena.finalize() {
            warn!(error = %e, "Finalization after unwind failed");
        }
    }
}

/// Resolves dependencies against one arena.
struct Resolver<'a> {
    container: &'a Container,
    arena: &'a Arena,
    path: Vec<TypeKey>,
}

impl<'a> Resolver<'a> {
    fn new(container: &'a Container, arena: &'a Arena) -> Self {
        Self {
            container,
            arena,
            path: Vec::new(),
        }
    }

    /// Calls `functor` with its dependencies, then every functor it returns.
    fn execute(&mut self, functor: &dyn Functor) -> Result<(), Error> {
        let args = self.resolve_all(&functor.parameters())?;
        debug!(arguments = args.len(), "Calling functor");
        let further = functor.call(&args)?;
        if !further.is_empty() {
            debug!(count = further.len(), "Chaining functors");
        }
        for next in further {
            self.execute(next.as_ref())?;
        }
        Ok(())
    }

    fn resolve_all(&mut self, keys: &[TypeKey]) -> Result<Vec<Object>, Error> {
        keys.iter().map(|&key| self.get(key)).collect()
    }

    fn get(&mut self, key: TypeKey) -> Result<Object, Error> {
        if key.is_nil() {
            return Err(Error::Invalid(
                "container cannot resolve dependency of nil type".into(),
            ));
        }
        if let Some(object) = self.arena.get(key) {
            trace!(object = %key.short_name(), "Reused");
            return Ok(object);
        }
        if self.path.contains(&key) {
            return Err(Error::Cyclic(self.cycle_through(key)));
        }
        let (constructor, processors) = self.container.lookup(key);
        let Some(constructor) = constructor else {
            let message = match self.path.last() {
                Some(parent) => format!("{key} constructor is not registered (required by {parent})"),
                None => format!("{key} constructor is not registered"),
            };
            return Err(Error::NotFound(message));
        };
        self.path.push(key);
        let built = self.build(key, constructor.as_ref(), &processors);
        self.path.pop();
        built
    }

    fn build(
        &mut self,
        key: TypeKey,
        constructor: &dyn Constructor,
        processors: &[Arc<dyn Processor>],
    ) -> Result<Object, Error> {
        let args = self.resolve_all(&constructor.parameters())?;
        let (object, destructor) = constructor.create(&args)?;
        for processor in processors {
            let processed = self
                .resolve_all(&processor.parameters())
                .and_then(|args| processor.process(&object, &args));
            if let Err(e) = processed {
                return Err(discard(key, destructor, e));
            }
        }
        match self.arena.try_put(key, Rc::clone(&object), destructor) {
            Ok(()) => {
                debug!(object = %key.short_name(), processors = processors.len(), "Created");
                Ok(object)
            }
            Err((e, destructor)) => Err(discard(key, destructor, e)),
        }
    }

    fn cycle_through(&self, key: TypeKey) -> String {
        let start = self.path.iter().position(|k| *k == key).unwrap_or(0);
        self.path[start..]
            .iter()
            .chain(std::iter::once(&key))
            .map(TypeKey::short_name)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Tears down an object that never made it into the arena.
fn discard(key: TypeKey, destructor: Destructor, cause: Error) -> Error {
    warn!(object = %key.short_name(), error = %cause, "Discarding object");
    match destructor.destroy() {
        Ok(()) => cause,
        Err(e) => Error::Joined(vec![cause, e]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{constructor, functor, processor};
    use crate::error::ErrorKind;
    use crate::mock::{Journal, MockConstructor, MockFunctor};
    use std::cell::{Cell, RefCell};

    struct Config {
        name: &'static str,
    }
    struct Service {
        label: String,
    }

    #[test]
    fn provide_rejects_duplicates_and_nil_types() {
        let container = Container::new();
        container.provide(MockConstructor::of(|| 1u8)).unwrap();

        let err = container.provide(MockConstructor::of(|| 2u8)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Ambiguous);

        let err = container
            .provide(MockConstructor::of(|| 0u16).keyed(TypeKey::nil()))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn attach_accepts_many_processors_per_type() {
        let container = Container::new();
        container
            .attach(processor(|_: &Config, ()| Ok(())))
            .unwrap();
        container
            .attach(processor(|_: &Config, ()| Ok(())))
            .unwrap();

        let (ctor, processors) = container.lookup(TypeKey::of::<Config>());
        assert!(ctor.is_none());
        assert_eq!(processors.len(), 2);
    }

    #[test]
    fn explore_visits_constructors_and_processor_only_types() {
        let container = Container::new();
        container.provide(MockConstructor::of(|| 1u8)).unwrap();
        container
            .attach(processor(|_: &Config, ()| Ok(())))
            .unwrap();

        let mut seen = Vec::new();
        container.explore(|key, ctor, processors| {
            seen.push((key, ctor.is_some(), processors.len()));
            true
        });
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&(TypeKey::of::<u8>(), true, 0)));
        assert!(seen.contains(&(TypeKey::of::<Config>(), false, 1)));

        let mut visits = 0;
        container.explore(|_, _, _| {
            visits += 1;
            false
        });
        assert_eq!(visits, 1);
    }

    #[test]
    fn resolves_dependencies_depth_first_and_processes_before_caching() {
        let container = Container::new();
        container
            .provide(constructor(|()| Ok(Config { name: "desk" })))
            .unwrap();
        container
            .provide(constructor(|(config,): (Rc<Config>,)| {
                Ok(Service {
                    label: config.name.to_string(),
                })
            }))
            .unwrap();

        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        container
            .run([functor(move |(service,): (Rc<Service>,)| {
                sink.borrow_mut().push_str(&service.label);
                Ok(())
            })])
            .unwrap();
        assert_eq!(*seen.borrow(), "desk");
    }

    #[test]
    fn each_type_is_constructed_once_per_run() {
        let container = Container::new();
        let mock = MockConstructor::of(|| 42u32);
        let calls = mock.call_counter();
        container.provide(mock).unwrap();

        let journal = Journal::new();
        container
            .run([
                MockFunctor::named("first")
                    .depends_on::<u32>()
                    .with_journal(&journal)
                    .boxed(),
                MockFunctor::named("second")
                    .depends_on::<u32>()
                    .with_journal(&journal)
                    .boxed(),
            ])
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(journal.entries(), vec!["call first", "call second"]);
    }

    #[test]
    fn missing_constructor_is_not_found() {
        let container = Container::new();
        container
            .provide(MockConstructor::of(|| 1u8).depends_on::<u16>())
            .unwrap();

        let err = container
            .run([MockFunctor::named("f").depends_on::<u8>().boxed()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("u16"));
    }

    #[test]
    fn nil_parameter_is_invalid() {
        let container = Container::new();
        let err = container
            .run([MockFunctor::named("f").depends_on_key(TypeKey::nil()).boxed()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Invalid);
    }

    #[test]
    fn constructor_cycles_are_reported() {
        let container = Container::new();
        container
            .provide(MockConstructor::of(|| 1u8).depends_on::<u16>())
            .unwrap();
        container
            .provide(MockConstructor::of(|| 1u16).depends_on::<u8>())
            .unwrap();

        let err = container
            .run([MockFunctor::named("f").depends_on::<u8>().boxed()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cyclic);
        assert_eq!(err.to_string(), "cyclic dependency: u8 -> u16 -> u8");
    }

    #[test]
    fn failed_processor_destroys_the_unregistered_object() {
        let container = Container::new();
        let journal = Journal::new();
        container
            .provide(MockConstructor::of(|| 1u8).with_journal(&journal))
            .unwrap();
        container
            .attach(processor(|_: &u8, ()| Err(Error::Illegal("rejected".into()))))
            .unwrap();

        let err = container
            .run([MockFunctor::named("f").depends_on::<u8>().boxed()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Illegal);
        assert_eq!(journal.entries(), vec!["create u8", "destroy u8"]);
    }

    #[test]
    fn processors_run_with_their_own_dependencies() {
        struct Counter {
            value: Cell<u32>,
        }
        let container = Container::new();
        container
            .provide(constructor(|()| Ok(Counter { value: Cell::new(1) })))
            .unwrap();
        container.provide(constructor(|()| Ok(10u32))).unwrap();
        container
            .attach(processor(|counter: &Counter, (step,): (Rc<u32>,)| {
                counter.value.set(counter.value.get() + *step);
                Ok(())
            }))
            .unwrap();

        let observed = Rc::new(Cell::new(0));
        let sink = Rc::clone(&observed);
        container
            .run([functor(move |(counter,): (Rc<Counter>,)| {
                sink.set(counter.value.get());
                Ok(())
            })])
            .unwrap();
        assert_eq!(observed.get(), 11);
    }

    #[test]
    fn failing_functor_stops_the_remaining_functors() {
        let container = Container::new();
        let journal = Journal::new();
        let err = container
            .run([
                MockFunctor::named("first")
                    .with_journal(&journal)
                    .fail("boom")
                    .boxed(),
                MockFunctor::named("second").with_journal(&journal).boxed(),
            ])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Custom);
        assert_eq!(journal.entries(), vec!["call first"]);
    }

    #[test]
    fn run_error_is_joined_with_finalization_errors() {
        let container = Container::new();
        container
            .provide(MockConstructor::of(|| 1u8).fail_destroy("leak"))
            .unwrap();
        let err = container
            .run([MockFunctor::named("f")
                .depends_on::<u8>()
                .fail("boom")
                .boxed()])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Joined);
        assert_eq!(err.to_string(), "boom; leak");
    }

    #[test]
    #[should_panic(expected = "ambiguous")]
    fn must_provide_panics_on_error() {
        let container = Container::new();
        container.must_provide(MockConstructor::of(|| 1u8));
        container.must_provide(MockConstructor::of(|| 1u8));
    }
}
