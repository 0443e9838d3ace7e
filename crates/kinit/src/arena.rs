//! # Arena
//!
//! An arena is the object store of one invocation scope. It maps each
//! [`TypeKey`] to at most one object and records a destructor per object in
//! registration order. Finalizing the arena runs those destructors last
//! registered first, which mirrors nested acquisition: whatever was built on
//! top of an object is torn down before the object itself.
//!
//! Arenas can be chained. A lookup that misses locally falls back to each
//! parent in turn, skipping parents that were already finalized. A child
//! never destroys objects that belong to a parent.
//!
//! ```rust
//! use kinit::{Arena, Destructor, TypeKey};
//! use std::rc::Rc;
//!
//! let parent = Arena::new();
//! parent.put(TypeKey::of::<u32>(), Rc::new(7u32), Destructor::noop()).unwrap();
//!
//! let child = Arena::with_parents(&[parent.clone()]);
//! assert_eq!(*child.get_as::<u32>().unwrap(), 7);
//!
//! child.finalize().unwrap();
//! parent.finalize().unwrap();
//! ```

use crate::destructor::Destructor;
use crate::error::Error;
use crate::key::{Object, TypeKey};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, info, trace, warn};

/// A scoped object store with ordered teardown.
///
/// `Arena` is a cheap handle; clones refer to the same store.
#[derive(Clone)]
pub struct Arena {
    inner: Rc<ArenaInner>,
}

pub(crate) struct ArenaInner {
    objects: RefCell<HashMap<TypeKey, Object>>,
    destructors: RefCell<Vec<(TypeKey, Destructor)>>,
    parents: Vec<Arena>,
    finalized: Cell<bool>,
}

/// A non-owning reference to an arena, held by runtimes that live inside it.
#[derive(Clone)]
pub(crate) struct WeakArena(Weak<ArenaInner>);

impl WeakArena {
    pub(crate) fn upgrade(&self) -> Option<Arena> {
        self.0.upgrade().map(|inner| Arena { inner })
    }
}

impl Arena {
    pub fn new() -> Self {
        Self::with_parents(&[])
    }

    /// Creates an arena that consults `parents`, in order, when a lookup misses.
    pub fn with_parents(parents: &[Arena]) -> Self {
        Self {
            inner: Rc::new(ArenaInner {
                objects: RefCell::new(HashMap::new()),
                destructors: RefCell::new(Vec::new()),
                parents: parents.to_vec(),
                finalized: Cell::new(false),
            }),
        }
    }

    /// Registers `object` under `key` together with its destructor.
    ///
    /// Fails with `Invalid` for the nil key, `Illegal` once the arena is
    /// finalized and `Ambiguous` if `key` is already registered here. On
    /// failure nothing is stored and the destructor is dropped unexecuted.
    pub fn put(&self, key: TypeKey, object: Object, destructor: Destructor) -> Result<(), Error> {
        self.try_put(key, object, destructor).map_err(|(e, _)| e)
    }

    /// Like [`Arena::put`], but hands the destructor back on failure so the
    /// caller can still run it.
    pub(crate) fn try_put(
        &self,
        key: TypeKey,
        object: Object,
        destructor: Destructor,
    ) -> Result<(), (Error, Destructor)> {
        if key.is_nil() {
            return Err((
                Error::Invalid("arena cannot register object of nil type".into()),
                destructor,
            ));
        }
        if self.is_finalized() {
            return Err((
                Error::Illegal(format!("arena is finalized and cannot register {key} object")),
                destructor,
            ));
        }
        let mut objects = self.inner.objects.borrow_mut();
        if objects.contains_key(&key) {
            return Err((
                Error::Ambiguous(format!("{key} object already registered")),
                destructor,
            ));
        }
        objects.insert(key, object);
        self.inner.destructors.borrow_mut().push((key, destructor));
        trace!(object = %key.short_name(), size = objects.len(), "Registered");
        Ok(())
    }

    /// Returns the object registered under `key` here or in a live parent.
    pub fn get(&self, key: TypeKey) -> Option<Object> {
        if key.is_nil() {
            return None;
        }
        if let Some(object) = self.inner.objects.borrow().get(&key) {
            return Some(Rc::clone(object));
        }
        self.inner
            .parents
            .iter()
            .filter(|parent| !parent.is_finalized())
            .find_map(|parent| parent.get(key))
    }

    /// Typed variant of [`Arena::get`].
    pub fn get_as<T: Any>(&self) -> Option<Rc<T>> {
        self.get(TypeKey::of::<T>())
            .and_then(|object| object.downcast::<T>().ok())
    }

    /// Returns true if `key` is registered on this arena itself.
    pub fn contains_local(&self, key: TypeKey) -> bool {
        self.inner.objects.borrow().contains_key(&key)
    }

    /// Number of objects registered on this arena itself.
    pub fn len(&self) -> usize {
        self.inner.objects.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.get()
    }

    /// Runs every recorded destructor, last registered first.
    ///
    /// The arena is marked finalized before the first destructor runs, so a
    /// destructor that tries to register on it is refused. A failing
    /// destructor does not stop the others; all failures are joined.
    /// Objects stay readable afterwards.
    pub fn finalize(&self) -> Result<(), Error> {
        if self.inner.finalized.replace(true) {
            return Err(Error::Illegal("arena is already finalized".into()));
        }
        let destructors = std::mem::take(&mut *self.inner.destructors.borrow_mut());
        let total = destructors.len();
        let mut errors = Vec::new();
        for (key, destructor) in destructors.into_iter().rev() {
            let noop = destructor.is_noop();
            match destructor.destroy() {
                Ok(()) if !noop => debug!(object = %key.short_name(), "Destroyed"),
                Ok(()) => {}
                Err(e) => {
                    warn!(object = %key.short_name(), error = %e, "Destructor failed");
                    errors.push(e);
                }
            }
        }
        info!(objects = total, failed = errors.len(), "Arena finalized");
        match Error::from_many(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakArena {
        WeakArena(Rc::downgrade(&self.inner))
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ArenaInner {
    fn drop(&mut self) {
        let pending = self.destructors.get_mut().len();
        if !self.finalized.get() && pending > 0 {
            warn!(pending, "Arena dropped without finalization");
        }
    }
}
