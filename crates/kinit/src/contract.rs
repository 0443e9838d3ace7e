//! # Contracts
//!
//! The container only ever talks to these three traits. How an implementation
//! came to be (hand-written, or built from a closure by the [`adapter`]
//! module) is irrelevant to resolution.
//!
//! - [`Constructor`]: builds exactly one kind of object from its dependencies.
//! - [`Processor`]: post-processes a freshly built object before it is cached.
//! - [`Functor`]: an activity that consumes dependencies and may return
//!   further activities to run next.
//!
//! Arguments are passed as resolved [`Object`]s in the exact order of
//! `parameters()`.
//!
//! [`adapter`]: crate::adapter

use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};

/// Knows how to create objects of one type.
///
/// Constructors are stored in a [`Container`](crate::Container) for its whole
/// lifetime and may be shared across threads, hence `Send + Sync`.
pub trait Constructor: Send + Sync {
    /// The type of object this constructor creates.
    fn type_key(&self) -> TypeKey;

    /// Types this constructor depends on, in argument order.
    fn parameters(&self) -> Vec<TypeKey>;

    /// Creates a new object from resolved arguments, along with the
    /// destructor that will tear it down.
    fn create(&self, args: &[Object]) -> Result<(Object, Destructor), Error>;
}

/// Post-processes objects of one type after construction.
///
/// Processors see the object through a shared reference; mutation goes
/// through interior mutability in the object itself.
pub trait Processor: Send + Sync {
    /// The type of object this processor handles.
    fn type_key(&self) -> TypeKey;

    /// Additional types this processor depends on, in argument order.
    fn parameters(&self) -> Vec<TypeKey>;

    fn process(&self, object: &Object, args: &[Object]) -> Result<(), Error>;
}

/// A runnable activity with declared dependencies.
pub trait Functor {
    /// Types this functor depends on, in argument order.
    fn parameters(&self) -> Vec<TypeKey>;

    /// Runs the activity. Returned functors run next, depth-first, in the
    /// same arena.
    fn call(&self, args: &[Object]) -> Result<Vec<Box<dyn Functor>>, Error>;
}
