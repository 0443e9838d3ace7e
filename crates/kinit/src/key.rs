//! # Type Identity
//!
//! Objects are keyed by [`TypeKey`], a comparable identity derived from
//! [`TypeId`]. The key also remembers the type name so errors and logs can
//! say *what* was missing instead of printing an opaque id.

use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A type-erased object owned by an arena.
pub type Object = Rc<dyn Any>;

/// Identity of an object kind.
///
/// Equality and hashing only look at the underlying [`TypeId`]. Ordering
/// sorts by type name first, which keeps registry walks and diagnostics
/// stable between runs.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: Option<TypeId>,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any + ?Sized>() -> Self {
        Self {
            id: Some(TypeId::of::<T>()),
            name: type_name::<T>(),
        }
    }

    /// The null identity. Every registration or resolution that receives it
    /// fails with [`Error::Invalid`](crate::Error::Invalid).
    pub const fn nil() -> Self {
        Self {
            id: None,
            name: "<nil>",
        }
    }

    pub fn is_nil(&self) -> bool {
        self.id.is_none()
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without module paths, used as a compact logging field.
    ///
    /// `alloc::rc::Rc<my_app::Settings>` becomes `Rc<Settings>`.
    pub fn short_name(&self) -> String {
        let mut out = String::with_capacity(self.name.len());
        let mut segment = String::new();
        for c in self.name.chars() {
            if c.is_alphanumeric() || c == '_' || c == ':' {
                segment.push(c);
            } else {
                out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
                segment.clear();
                out.push(c);
            }
        }
        out.push_str(segment.rsplit("::").next().unwrap_or(&segment));
        out
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl PartialOrd for TypeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }
        self.name
            .cmp(other.name)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}
