//! # Runtime
//!
//! Every run places a [`Runtime`] in its arena. A functor that depends on it
//! can register ready-made objects in the current scope, or start a nested
//! run in a child scope:
//!
//! ```rust
//! use kinit::{functor, Container, Runtime};
//! use std::rc::Rc;
//!
//! struct Request(u32);
//!
//! let container = Container::new();
//! container
//!     .run([functor(|(runtime,): (Rc<Runtime>,)| {
//!         for id in 0..3 {
//!             runtime.run([
//!                 kinit::injector(Request(id)),
//!                 functor(|(request,): (Rc<Request>,)| {
//!                     assert!(request.0 < 3);
//!                     Ok(())
//!                 }),
//!             ])?;
//!         }
//!         Ok(())
//!     })])
//!     .unwrap();
//! ```
//!
//! A nested run gets its own arena whose parent is the runtime's arena. It
//! reuses everything already built outside, and whatever it builds itself is
//! torn down when the nested run returns.

use crate::arena::{Arena, WeakArena};
use crate::container::Container;
use crate::contract::Functor;
use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};
use std::any::Any;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// A container bound to one arena.
///
/// The runtime only holds a weak reference to its arena because it is itself
/// stored there. Once the arena is gone every operation fails with
/// [`Error::Nil`].
pub struct Runtime {
    container: Container,
    arena: WeakArena,
}

impl Runtime {
    pub fn new(container: &Container, arena: &Arena) -> Self {
        Self {
            container: container.clone(),
            arena: arena.downgrade(),
        }
    }

    /// Registers an object on the bound arena. See [`Arena::put`].
    pub fn register(&self, key: TypeKey, object: Object, destructor: Destructor) -> Result<(), Error> {
        self.arena("register object")?.put(key, object, destructor)
    }

    /// Registers `value` under its own type with a no-op destructor.
    pub fn register_value<T: Any>(&self, value: T) -> Result<(), Error> {
        self.register(TypeKey::of::<T>(), Rc::new(value), Destructor::noop())
    }

    /// Panicking variant of [`Runtime::register`].
    pub fn must_register(&self, key: TypeKey, object: Object, destructor: Destructor) {
        if let Err(e) = self.register(key, object, destructor) {
            panic!("{e}");
        }
    }

    /// Runs `functors` in a child arena of the bound arena.
    ///
    /// The child arena is finalized before this returns, so objects created
    /// by the nested run are destroyed before any object of the outer scope.
    pub fn run<I>(&self, functors: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        let parent = self.arena("run functors")?;
        debug!(parent_objects = parent.len(), "Nested run started");
        self.container
            .run_in(Arena::with_parents(&[parent]), functors)
    }

    /// Panicking variant of [`Runtime::run`].
    pub fn must_run<I>(&self, functors: I)
    where
        I: IntoIterator<Item = Box<dyn Functor>>,
    {
        if let Err(e) = self.run(functors) {
            panic!("{e}");
        }
    }

    /// Returns true while the bound arena is alive.
    pub fn is_attached(&self) -> bool {
        self.arena.upgrade().is_some()
    }

    fn arena(&self, action: &str) -> Result<Arena, Error> {
        self.arena
            .upgrade()
            .ok_or_else(|| Error::Nil(format!("detached runtime cannot {action}")))
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("attached", &self.is_attached())
            .finish()
    }
}
