//! # Declarations
//!
//! Deferred setup. A [`Declaration`] collects registration functions and
//! calls them all, in order, exactly once. The global module fulfills its
//! declaration right before the first global run.

use crate::error::Error;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

type Declared = Box<dyn FnOnce() -> Result<(), Error> + Send>;

/// An ordered list of deferred setup functions that run exactly once.
///
/// Libraries use a declaration to postpone their registrations until the
/// first run instead of doing the work when they are loaded.
#[derive(Default)]
pub struct Declaration {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    functions: Vec<Declared>,
    fulfilled: bool,
}

impl Declaration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `function`. Fails with [`Error::Illegal`] once the declaration
    /// has been fulfilled.
    pub fn declare<F>(&self, function: F) -> Result<(), Error>
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        let mut state = self.lock();
        if state.fulfilled {
            return Err(Error::Illegal(
                "declaration has already called declared functions".into(),
            ));
        }
        state.functions.push(Box::new(function));
        Ok(())
    }

    pub fn must_declare<F>(&self, function: F)
    where
        F: FnOnce() -> Result<(), Error> + Send + 'static,
    {
        if let Err(e) = self.declare(function) {
            panic!("{e}");
        }
    }

    /// Calls the declared functions in order and stops at the first error.
    ///
    /// The declaration counts as fulfilled even if a function fails, so a
    /// second call is always [`Error::Illegal`].
    pub fn fulfill(&self) -> Result<(), Error> {
        let functions = {
            let mut state = self.lock();
            if state.fulfilled {
                return Err(Error::Illegal(
                    "declaration has already called declared functions".into(),
                ));
            }
            state.fulfilled = true;
            std::mem::take(&mut state.functions)
        };
        debug!(count = functions.len(), "Fulfilling declaration");
        functions.into_iter().try_for_each(|function| function())
    }

    pub fn must_fulfill(&self) {
        if let Err(e) = self.fulfill() {
            panic!("{e}");
        }
    }

    pub fn is_fulfilled(&self) -> bool {
        self.lock().fulfilled
    }

    /// Fulfills the declaration unless that already happened.
    pub(crate) fn fulfill_pending(&self) -> Result<(), Error> {
        if self.is_fulfilled() {
            return Ok(());
        }
        match self.fulfill() {
            // Lost a race against another caller.
            Err(Error::Illegal(_)) => Ok(()),
            other => other,
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("Declaration")
            .field("pending", &state.functions.len())
            .field("fulfilled", &state.fulfilled)
            .finish()
    }
}
