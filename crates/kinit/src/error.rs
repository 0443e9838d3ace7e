//! # Errors
//!
//! Every fallible operation in the crate returns [`Error`]. The variants are
//! semantic classes rather than concrete failure sites, so callers can branch
//! on [`Error::kind`] without parsing messages.
//!
//! User code (constructors, processors, functors, destructors) reports its own
//! failures through [`Error::custom`]; those errors pass through the container
//! untouched and can be recovered with [`Error::downcast_custom`].

use std::fmt;

/// Errors produced by arenas, containers and runtimes.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A malformed argument, such as the nil type key.
    #[error("invalid: {0}")]
    Invalid(String),
    /// A second registration for something that must be unique.
    #[error("ambiguous: {0}")]
    Ambiguous(String),
    /// A dependency without a registered constructor.
    #[error("not found: {0}")]
    NotFound(String),
    /// An operation not permitted in the current lifecycle state.
    #[error("illegal: {0}")]
    Illegal(String),
    /// An operation on a detached runtime.
    #[error("nil: {0}")]
    Nil(String),
    /// A dependency chain that loops back onto itself.
    #[error("cyclic dependency: {0}")]
    Cyclic(String),
    /// An error raised by user code.
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
    /// Several independent failures, in the order they happened.
    #[error("{}", JoinedDisplay(.0))]
    Joined(Vec<Error>),
}

/// The class of an [`Error`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Invalid,
    Ambiguous,
    NotFound,
    Illegal,
    Nil,
    Cyclic,
    Custom,
    Joined,
}

impl Error {
    /// Wraps a user error so it can travel through the container.
    pub fn custom<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Custom(Box::new(error))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Invalid(_) => ErrorKind::Invalid,
            Error::Ambiguous(_) => ErrorKind::Ambiguous,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Illegal(_) => ErrorKind::Illegal,
            Error::Nil(_) => ErrorKind::Nil,
            Error::Cyclic(_) => ErrorKind::Cyclic,
            Error::Custom(_) => ErrorKind::Custom,
            Error::Joined(_) => ErrorKind::Joined,
        }
    }

    /// Returns true if this error, or any error joined into it, is of `kind`.
    pub fn contains(&self, kind: ErrorKind) -> bool {
        match self {
            Error::Joined(errors) => errors.iter().any(|e| e.contains(kind)),
            other => other.kind() == kind,
        }
    }

    /// Flattens joined errors into their leaves.
    pub fn leaves(&self) -> Vec<&Error> {
        match self {
            Error::Joined(errors) => errors.iter().flat_map(Error::leaves).collect(),
            other => vec![other],
        }
    }

    /// Returns the user error of type `E` if this is a [`Error::Custom`] carrying one.
    pub fn downcast_custom<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            Error::Custom(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Builds one error out of many. Returns `None` for an empty list and the
    /// error itself for a list of one.
    pub fn from_many(mut errors: Vec<Error>) -> Option<Error> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Error::Joined(errors)),
        }
    }

    /// Merges the outcome of an operation with the outcome of its cleanup.
    /// Neither error is discarded.
    pub fn join(first: Result<(), Error>, second: Result<(), Error>) -> Result<(), Error> {
        let errors: Vec<Error> = [first.err(), second.err()]
            .into_iter()
            .flatten()
            .flat_map(|e| match e {
                Error::Joined(inner) => inner,
                other => vec![other],
            })
            .collect();
        match Error::from_many(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct JoinedDisplay<'a>(&'a [Error]);

impl fmt::Display for JoinedDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
