//! One-shot cleanup actions recorded by arenas.

use crate::error::Error;
use std::fmt;

/// Cleanup for an object registered on an [`Arena`](crate::Arena).
///
/// A destructor runs at most once. Dropping one without calling
/// [`Destructor::destroy`] does nothing.
pub struct Destructor {
    action: Option<Box<dyn FnOnce() -> Result<(), Error>>>,
}

impl Destructor {
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() -> Result<(), Error> + 'static,
    {
        Self {
            action: Some(Box::new(action)),
        }
    }

    /// A destructor that does nothing.
    pub fn noop() -> Self {
        Self { action: None }
    }

    pub fn is_noop(&self) -> bool {
        self.action.is_none()
    }

    pub fn destroy(self) -> Result<(), Error> {
        match self.action {
            Some(action) => action(),
            None => Ok(()),
        }
    }
}

impl Default for Destructor {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for Destructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Destructor")
            .field("noop", &self.is_noop())
            .finish()
    }
}
