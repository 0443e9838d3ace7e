//! # Mocks & Testing Guide
//!
//! The mocks in this module implement the [`Constructor`], [`Processor`] and
//! [`Functor`] contracts with scripted behavior. They let tests describe a
//! dependency graph by its shape alone and then assert on what the container
//! did with it, in order, through a shared [`Journal`].
//!
//! | Mock | Records | Scriptable |
//! |------|---------|------------|
//! | [`MockConstructor`] | `create <type>`, `destroy <type>` | dependencies, creation and destruction failures, call count |
//! | [`MockProcessor`] | `process <type>` | dependencies, failure |
//! | [`MockFunctor`] | `call <name>` | dependencies, failure, follow-up functors |
//!
//! ## Example
//!
//! ```rust
//! use kinit::mock::{Journal, MockConstructor, MockFunctor};
//! use kinit::Container;
//!
//! let journal = Journal::new();
//! let container = Container::new();
//! container
//!     .provide(MockConstructor::of(|| 1u8).with_journal(&journal))
//!     .unwrap();
//! container
//!     .provide(
//!         MockConstructor::of(|| 2u16)
//!             .depends_on::<u8>()
//!             .with_journal(&journal),
//!     )
//!     .unwrap();
//!
//! container
//!     .run([MockFunctor::named("main")
//!         .depends_on::<u16>()
//!         .with_journal(&journal)
//!         .boxed()])
//!     .unwrap();
//!
//! assert_eq!(
//!     journal.entries(),
//!     vec!["create u8", "create u16", "call main", "destroy u16", "destroy u8"]
//! );
//! ```
//!
//! ## Testing Failure Scenarios
//!
//! Failures are injected as [`MockError`]s wrapped in [`Error::Custom`], so
//! they can be told apart from errors raised by the container itself:
//!
//! ```rust
//! use kinit::mock::{MockError, MockFunctor};
//! use kinit::{Container, ErrorKind};
//!
//! let err = Container::new()
//!     .run([MockFunctor::named("f").fail("boom").boxed()])
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Custom);
//! assert_eq!(err.downcast_custom::<MockError>().map(|e| e.0.as_str()), Some("boom"));
//! ```

use crate::contract::{Constructor, Functor, Processor};
use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};
use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An error injected by a mock.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct MockError(pub String);

fn injected(message: &str) -> Error {
    Error::custom(MockError(message.to_string()))
}

/// An append-only, shareable event log.
#[derive(Debug, Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// A snapshot of everything recorded so far.
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Counts invocations of a mock. Clones share the count.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A scripted [`Constructor`] producing values of `T`.
pub struct MockConstructor<T> {
    key: TypeKey,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    parameters: Vec<TypeKey>,
    journal: Option<Journal>,
    fail_create: Option<String>,
    fail_destroy: Option<String>,
    calls: CallCounter,
}

impl<T: Any> MockConstructor<T> {
    pub fn of<F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::of::<T>(),
            factory: Box::new(factory),
            parameters: Vec::new(),
            journal: None,
            fail_create: None,
            fail_destroy: None,
            calls: CallCounter::default(),
        }
    }

    /// Overrides the type key the constructor reports.
    pub fn keyed(mut self, key: TypeKey) -> Self {
        self.key = key;
        self
    }

    pub fn depends_on<D: Any>(self) -> Self {
        self.depends_on_key(TypeKey::of::<D>())
    }

    pub fn depends_on_key(mut self, key: TypeKey) -> Self {
        self.parameters.push(key);
        self
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn fail_create(mut self, message: &str) -> Self {
        self.fail_create = Some(message.to_string());
        self
    }

    /// Makes the destructor of every created object fail with `message`.
    pub fn fail_destroy(mut self, message: &str) -> Self {
        self.fail_destroy = Some(message.to_string());
        self
    }

    /// A handle on the number of `create` calls, usable after the mock has
    /// been moved into a container.
    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<T: Any> Constructor for MockConstructor<T> {
    fn type_key(&self) -> TypeKey {
        self.key
    }

    fn parameters(&self) -> Vec<TypeKey> {
        self.parameters.clone()
    }

    fn create(&self, args: &[Object]) -> Result<(Object, Destructor), Error> {
        self.calls.bump();
        if args.len() != self.parameters.len() {
            return Err(Error::Invalid(format!(
                "mock {} constructor expects {} argument(s), {} given",
                self.key,
                self.parameters.len(),
                args.len()
            )));
        }
        if let Some(message) = &self.fail_create {
            return Err(injected(message));
        }

        let short = TypeKey::of::<T>().short_name();
        if let Some(journal) = &self.journal {
            journal.record(format!("create {short}"));
        }
        let journal = self.journal.clone();
        let failure = self.fail_destroy.clone();
        let destructor = Destructor::new(move || {
            if let Some(journal) = journal {
                journal.record(format!("destroy {short}"));
            }
            match failure {
                Some(message) => Err(injected(&message)),
                None => Ok(()),
            }
        });
        Ok((Rc::new((self.factory)()), destructor))
    }
}

/// A scripted [`Processor`] for objects of `T`.
pub struct MockProcessor<T> {
    parameters: Vec<TypeKey>,
    journal: Option<Journal>,
    fail: Option<String>,
    calls: CallCounter,
    _marker: std::marker::PhantomData<fn(&T)>,
}

impl<T: Any> MockProcessor<T> {
    pub fn new() -> Self {
        Self {
            parameters: Vec::new(),
            journal: None,
            fail: None,
            calls: CallCounter::default(),
            _marker: std::marker::PhantomData,
        }
    }

    pub fn depends_on<D: Any>(mut self) -> Self {
        self.parameters.push(TypeKey::of::<D>());
        self
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }

    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

impl<T: Any> Default for MockProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Any> Processor for MockProcessor<T> {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn parameters(&self) -> Vec<TypeKey> {
        self.parameters.clone()
    }

    fn process(&self, object: &Object, _args: &[Object]) -> Result<(), Error> {
        self.calls.bump();
        if !(**object).is::<T>() {
            return Err(Error::Invalid(format!(
                "mock {} processor received an object of another type",
                TypeKey::of::<T>()
            )));
        }
        if let Some(journal) = &self.journal {
            journal.record(format!("process {}", TypeKey::of::<T>().short_name()));
        }
        match &self.fail {
            Some(message) => Err(injected(message)),
            None => Ok(()),
        }
    }
}

/// A scripted [`Functor`].
#[derive(Clone)]
pub struct MockFunctor {
    name: String,
    parameters: Vec<TypeKey>,
    journal: Option<Journal>,
    fail: Option<String>,
    further: Vec<MockFunctor>,
}

impl MockFunctor {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: Vec::new(),
            journal: None,
            fail: None,
            further: Vec::new(),
        }
    }

    pub fn depends_on<D: Any>(self) -> Self {
        self.depends_on_key(TypeKey::of::<D>())
    }

    pub fn depends_on_key(mut self, key: TypeKey) -> Self {
        self.parameters.push(key);
        self
    }

    pub fn with_journal(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    pub fn fail(mut self, message: &str) -> Self {
        self.fail = Some(message.to_string());
        self
    }

    /// Appends a functor to be returned from every successful call.
    pub fn then(mut self, further: MockFunctor) -> Self {
        self.further.push(further);
        self
    }

    pub fn boxed(self) -> Box<dyn Functor> {
        Box::new(self)
    }
}

impl Functor for MockFunctor {
    fn parameters(&self) -> Vec<TypeKey> {
        self.parameters.clone()
    }

    fn call(&self, args: &[Object]) -> Result<Vec<Box<dyn Functor>>, Error> {
        if args.len() != self.parameters.len() {
            return Err(Error::Invalid(format!(
                "mock functor {} expects {} argument(s), {} given",
                self.name,
                self.parameters.len(),
                args.len()
            )));
        }
        if let Some(journal) = &self.journal {
            journal.record(format!("call {}", self.name));
        }
        if let Some(message) = &self.fail {
            return Err(injected(message));
        }
        Ok(self.further.iter().cloned().map(MockFunctor::boxed).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Container;
    use crate::error::ErrorKind;

    #[test]
    fn journal_clones_share_entries() {
        let journal = Journal::new();
        let other = journal.clone();
        other.record("one");
        journal.record("two");
        assert_eq!(journal.entries(), vec!["one", "two"]);
        journal.clear();
        assert!(other.entries().is_empty());
    }

    #[test]
    fn constructor_failure_is_custom() {
        let mock = MockConstructor::of(|| 1u8).fail_create("no");
        let calls = mock.call_counter();
        let err = mock.create(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Custom);
        assert_eq!(err.downcast_custom::<MockError>(), Some(&MockError("no".into())));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn followers_run_after_their_parent() {
        let journal = Journal::new();
        Container::new()
            .run([
                MockFunctor::named("f1")
                    .with_journal(&journal)
                    .then(MockFunctor::named("f3").with_journal(&journal))
                    .boxed(),
                MockFunctor::named("f2").with_journal(&journal).boxed(),
            ])
            .unwrap();
        assert_eq!(journal.entries(), vec!["call f1", "call f3", "call f2"]);
    }

    #[test]
    fn processor_records_and_fails() {
        let journal = Journal::new();
        let container = Container::new();
        container
            .provide(MockConstructor::of(|| 5u32).with_journal(&journal))
            .unwrap();
        container
            .attach(MockProcessor::<u32>::new().with_journal(&journal).fail("bad"))
            .unwrap();

        let err = container
            .run([MockFunctor::named("f").depends_on::<u32>().boxed()])
            .unwrap_err();
        assert_eq!(err.to_string(), "bad");
        assert_eq!(
            journal.entries(),
            vec!["create u32", "process u32", "destroy u32"]
        );
    }
}
