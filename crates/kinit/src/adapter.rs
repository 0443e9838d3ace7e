//! # Typed Adapters
//!
//! Writing [`Constructor`], [`Processor`] and [`Functor`] by hand means
//! juggling [`Object`]s and [`TypeKey`]s. The adapters here derive both from
//! ordinary closures instead: the dependency list comes from the closure's
//! argument type, a tuple of `Rc<T>` handles.
//!
//! ```rust
//! use kinit::{constructor, functor, processor, Container, Error};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! struct Settings { workers: u32 }
//! struct Pool { size: Cell<u32> }
//!
//! let container = Container::new();
//! container.provide(constructor(|()| Ok(Settings { workers: 4 }))).unwrap();
//! container
//!     .provide(constructor(|(settings,): (Rc<Settings>,)| {
//!         Ok(Pool { size: Cell::new(settings.workers) })
//!     }))
//!     .unwrap();
//! container
//!     .attach(processor(|pool: &Pool, ()| {
//!         if pool.size.get() == 0 {
//!             return Err(Error::Invalid("empty pool".into()));
//!         }
//!         Ok(())
//!     }))
//!     .unwrap();
//!
//! container
//!     .run([functor(|(pool,): (Rc<Pool>,)| {
//!         assert_eq!(pool.size.get(), 4);
//!         Ok(())
//!     })])
//!     .unwrap();
//! ```

use crate::contract::{Constructor, Functor, Processor};
use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};
use crate::runtime::Runtime;
use std::any::{type_name, Any};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

/// A statically typed dependency list.
///
/// Implemented for `()` and for tuples of up to eight `Rc<T>` handles.
pub trait Dependencies: Sized {
    fn keys() -> Vec<TypeKey>;

    /// Converts resolved objects back into typed handles. `owner` names the
    /// consumer in error messages.
    fn from_objects(owner: &str, args: &[Object]) -> Result<Self, Error>;
}

fn expect_len(owner: &str, args: &[Object], expected: usize) -> Result<(), Error> {
    if args.len() != expected {
        return Err(Error::Invalid(format!(
            "{owner} expects {expected} argument(s), {} given",
            args.len()
        )));
    }
    Ok(())
}

fn downcast<T: Any>(owner: &str, index: usize, object: &Object) -> Result<Rc<T>, Error> {
    Rc::clone(object).downcast::<T>().map_err(|_| {
        Error::Invalid(format!(
            "{owner} expects argument {} to be of {} type",
            index + 1,
            type_name::<T>()
        ))
    })
}

impl Dependencies for () {
    fn keys() -> Vec<TypeKey> {
        Vec::new()
    }

    fn from_objects(owner: &str, args: &[Object]) -> Result<Self, Error> {
        expect_len(owner, args, 0)
    }
}

macro_rules! impl_dependencies {
    ($len:expr; $($name:ident : $idx:tt),+) => {
        impl<$($name: Any),+> Dependencies for ($(Rc<$name>,)+) {
            fn keys() -> Vec<TypeKey> {
                vec![$(TypeKey::of::<$name>()),+]
            }

            fn from_objects(owner: &str, args: &[Object]) -> Result<Self, Error> {
                expect_len(owner, args, $len)?;
                Ok(($(downcast::<$name>(owner, $idx, &args[$idx])?,)+))
            }
        }
    };
}

impl_dependencies!(1; A: 0);
impl_dependencies!(2; A: 0, B: 1);
impl_dependencies!(3; A: 0, B: 1, C: 2);
impl_dependencies!(4; A: 0, B: 1, C: 2, D: 3);
impl_dependencies!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_dependencies!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_dependencies!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_dependencies!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);

type Teardown<T> = Arc<dyn Fn(&T) -> Result<(), Error> + Send + Sync>;

/// A [`Constructor`] built from a closure. See [`constructor`].
pub struct FnConstructor<T, D, F> {
    factory: F,
    teardown: Option<Teardown<T>>,
    _marker: PhantomData<fn(D) -> T>,
}

/// Builds a constructor for `T` from a closure over its dependencies.
///
/// The object gets a no-op destructor unless one is added with
/// [`FnConstructor::on_teardown`].
pub fn constructor<T, D, F>(factory: F) -> FnConstructor<T, D, F>
where
    T: Any,
    D: Dependencies,
    F: Fn(D) -> Result<T, Error> + Send + Sync + 'static,
{
    FnConstructor {
        factory,
        teardown: None,
        _marker: PhantomData,
    }
}

/// Builds a constructor for a [`Close`] type. The object's destructor calls
/// [`Close::close`].
pub fn opener<T, D, F>(factory: F) -> FnConstructor<T, D, F>
where
    T: Close + Any,
    D: Dependencies,
    F: Fn(D) -> Result<T, Error> + Send + Sync + 'static,
{
    constructor(factory).on_teardown(|object: &T| object.close())
}

impl<T, D, F> FnConstructor<T, D, F> {
    /// Sets the cleanup that runs when the owning arena is finalized.
    pub fn on_teardown<G>(mut self, teardown: G) -> Self
    where
        G: Fn(&T) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(teardown));
        self
    }
}

impl<T, D, F> Constructor for FnConstructor<T, D, F>
where
    T: Any,
    D: Dependencies,
    F: Fn(D) -> Result<T, Error> + Send + Sync,
{
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn parameters(&self) -> Vec<TypeKey> {
        D::keys()
    }

    fn create(&self, args: &[Object]) -> Result<(Object, Destructor), Error> {
        let owner = format!("{} constructor", type_name::<T>());
        let deps = D::from_objects(&owner, args)?;
        let value = Rc::new((self.factory)(deps)?);
        let destructor = match &self.teardown {
            Some(teardown) => {
                let teardown = Arc::clone(teardown);
                let target = Rc::clone(&value);
                Destructor::new(move || teardown(&target))
            }
            None => Destructor::noop(),
        };
        Ok((value, destructor))
    }
}

/// Resources that need explicit release.
pub trait Close {
    fn close(&self) -> Result<(), Error>;
}

/// A [`Processor`] built from a closure. See [`processor`].
pub struct FnProcessor<T, D, F> {
    process: F,
    _marker: PhantomData<fn(&T, D)>,
}

/// Builds a processor for `T` from a closure receiving the object and the
/// processor's own dependencies.
pub fn processor<T, D, F>(process: F) -> FnProcessor<T, D, F>
where
    T: Any,
    D: Dependencies,
    F: Fn(&T, D) -> Result<(), Error> + Send + Sync + 'static,
{
    FnProcessor {
        process,
        _marker: PhantomData,
    }
}

impl<T, D, F> Processor for FnProcessor<T, D, F>
where
    T: Any,
    D: Dependencies,
    F: Fn(&T, D) -> Result<(), Error> + Send + Sync,
{
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn parameters(&self) -> Vec<TypeKey> {
        D::keys()
    }

    fn process(&self, object: &Object, args: &[Object]) -> Result<(), Error> {
        let owner = format!("{} processor", type_name::<T>());
        let deps = D::from_objects(&owner, args)?;
        let target = (**object)
            .downcast_ref::<T>()
            .ok_or_else(|| Error::Invalid(format!("{owner} received an object of another type")))?;
        (self.process)(target, deps)
    }
}

/// What a functor closure may return: nothing, one follow-up functor, an
/// optional one, or a list.
pub trait Further {
    fn into_functors(self) -> Vec<Box<dyn Functor>>;
}

impl Further for () {
    fn into_functors(self) -> Vec<Box<dyn Functor>> {
        Vec::new()
    }
}

impl Further for Box<dyn Functor> {
    fn into_functors(self) -> Vec<Box<dyn Functor>> {
        vec![self]
    }
}

impl Further for Option<Box<dyn Functor>> {
    fn into_functors(self) -> Vec<Box<dyn Functor>> {
        self.into_iter().collect()
    }
}

impl Further for Vec<Box<dyn Functor>> {
    fn into_functors(self) -> Vec<Box<dyn Functor>> {
        self
    }
}

/// A [`Functor`] built from a closure. See [`functor`].
pub struct FnFunctor<D, R, F> {
    call: F,
    _marker: PhantomData<fn(D) -> R>,
}

/// Builds a functor from a closure over its dependencies.
pub fn functor<D, R, F>(call: F) -> Box<dyn Functor>
where
    D: Dependencies + 'static,
    R: Further + 'static,
    F: Fn(D) -> Result<R, Error> + 'static,
{
    Box::new(FnFunctor {
        call,
        _marker: PhantomData,
    })
}

impl<D, R, F> Functor for FnFunctor<D, R, F>
where
    D: Dependencies,
    R: Further,
    F: Fn(D) -> Result<R, Error>,
{
    fn parameters(&self) -> Vec<TypeKey> {
        D::keys()
    }

    fn call(&self, args: &[Object]) -> Result<Vec<Box<dyn Functor>>, Error> {
        let deps = D::from_objects("functor", args)?;
        (self.call)(deps).map(Further::into_functors)
    }
}

/// A functor that places a ready-made object in the current arena instead of
/// constructing it. See [`injector`].
pub struct Injector {
    key: TypeKey,
    object: Object,
}

/// Builds a functor that registers `value` on the running arena with a no-op
/// destructor.
pub fn injector<T: Any>(value: T) -> Box<dyn Functor> {
    Box::new(Injector {
        key: TypeKey::of::<T>(),
        object: Rc::new(value),
    })
}

impl Functor for Injector {
    fn parameters(&self) -> Vec<TypeKey> {
        vec![TypeKey::of::<Runtime>()]
    }

    fn call(&self, args: &[Object]) -> Result<Vec<Box<dyn Functor>>, Error> {
        let owner = format!("{} injector", self.key);
        expect_len(&owner, args, 1)?;
        let runtime = downcast::<Runtime>(&owner, 0, &args[0])?;
        runtime.register(self.key, Rc::clone(&self.object), Destructor::noop())?;
        Ok(Vec::new())
    }
}
