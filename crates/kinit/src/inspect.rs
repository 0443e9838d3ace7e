//! # Static Inspection
//!
//! [`Container::run`] only discovers a missing constructor or a cycle when a
//! functor actually asks for the affected type. The [`Inspector`] walks the
//! registered graph up front, without creating anything, and reports every
//! problem it finds at once.
//!
//! ```rust
//! use kinit::mock::MockConstructor;
//! use kinit::{Container, ErrorKind, Inspector, InspectOptions};
//!
//! let container = Container::new();
//! container
//!     .provide(MockConstructor::of(|| 1u8).depends_on::<u16>())
//!     .unwrap();
//!
//! let err = Inspector::new()
//!     .inspect(&container, &InspectOptions::default())
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::NotFound);
//! assert_eq!(err.to_string(), "not found: unsatisfied dependency: u8 -> u16");
//! ```

use crate::container::Container;
use crate::contract::Functor;
use crate::error::Error;
use crate::key::TypeKey;
use crate::runtime::Runtime;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Controls what [`Inspector::inspect`] looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InspectOptions {
    /// Walk only the required types, skipping constructors and processors
    /// that none of them needs.
    pub inspect_only_required: bool,
    /// Do not report processors attached to types that have no constructor.
    /// Has no effect together with `inspect_only_required`.
    pub allow_irrelevant_processors: bool,
}

/// Checks a container for cyclic and unsatisfied dependencies.
///
/// Types are either required (must be satisfiable) or ignored (assumed
/// satisfied, e.g. because they are registered at run time). [`Runtime`] is
/// ignored from the start.
#[derive(Debug, Clone)]
pub struct Inspector {
    types: BTreeMap<TypeKey, bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

#[derive(Default)]
struct Walk {
    history: HashMap<TypeKey, Visit>,
    stack: Vec<TypeKey>,
    findings: Vec<Error>,
}

impl Inspector {
    pub fn new() -> Self {
        let mut types = BTreeMap::new();
        types.insert(TypeKey::of::<Runtime>(), true);
        Self { types }
    }

    /// Marks `key` as a type the inspected container must be able to build.
    /// Requiring an ignored type keeps it ignored.
    pub fn require(&mut self, key: TypeKey) -> Result<&mut Self, Error> {
        if key.is_nil() {
            return Err(Error::Invalid("inspector cannot register nil type".into()));
        }
        self.types.entry(key).or_insert(false);
        Ok(self)
    }

    /// Marks `key` as satisfied regardless of the container's contents.
    pub fn ignore(&mut self, key: TypeKey) -> Result<&mut Self, Error> {
        if key.is_nil() {
            return Err(Error::Invalid("inspector cannot register nil type".into()));
        }
        self.types.insert(key, true);
        Ok(self)
    }

    pub fn must_require(&mut self, key: TypeKey) -> &mut Self {
        match self.require(key) {
            Ok(inspector) => inspector,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn must_ignore(&mut self, key: TypeKey) -> &mut Self {
        match self.ignore(key) {
            Ok(inspector) => inspector,
            Err(e) => panic!("{e}"),
        }
    }

    /// Requires every parameter of `functor`, so that inspection proves the
    /// functor can be run on the inspected container.
    pub fn consider(&mut self, functor: &dyn Functor) -> Result<&mut Self, Error> {
        for key in functor.parameters() {
            self.require(key)?;
        }
        Ok(self)
    }

    pub fn must_consider(&mut self, functor: &dyn Functor) -> &mut Self {
        match self.consider(functor) {
            Ok(inspector) => inspector,
            Err(e) => panic!("{e}"),
        }
    }

    /// Walks the container and joins every finding into one error.
    pub fn inspect(&self, container: &Container, options: &InspectOptions) -> Result<(), Error> {
        let mut walk = Walk::default();
        for (&key, &ignored) in &self.types {
            if !ignored {
                self.visit(container, key, &mut walk);
            }
        }

        if !options.inspect_only_required {
            let mut orphans: Vec<(TypeKey, Option<Vec<TypeKey>>)> = Vec::new();
            container.explore(|key, constructor, processors| {
                if constructor.is_some() {
                    orphans.push((key, None));
                } else {
                    let parameters: Vec<TypeKey> =
                        processors.iter().flat_map(|p| p.parameters()).collect();
                    orphans.push((key, Some(parameters)));
                }
                true
            });
            for (key, processor_parameters) in orphans {
                match processor_parameters {
                    None => self.visit(container, key, &mut walk),
                    Some(parameters) => {
                        if !options.allow_irrelevant_processors {
                            walk.findings.push(Error::Invalid(format!(
                                "{} processor(s) found in absence of constructor",
                                key.short_name()
                            )));
                        }
                        self.visit_all(container, &parameters, &mut walk);
                    }
                }
            }
        }

        debug!(
            visited = walk.history.len(),
            findings = walk.findings.len(),
            "Inspection finished"
        );
        match Error::from_many(walk.findings) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn must_inspect(&self, container: &Container, options: &InspectOptions) {
        if let Err(e) = self.inspect(container, options) {
            panic!("{e}");
        }
    }

    fn visit(&self, container: &Container, key: TypeKey, walk: &mut Walk) {
        if self.types.get(&key).copied().unwrap_or(false) {
            return;
        }
        match walk.history.get(&key) {
            Some(Visit::Done) => return,
            Some(Visit::InProgress) => {
                let start = walk.stack.iter().rposition(|k| *k == key).unwrap_or(0);
                let path = walk.stack[start..]
                    .iter()
                    .chain(std::iter::once(&key))
                    .map(TypeKey::short_name)
                    .collect::<Vec<_>>()
                    .join(" -> ");
                walk.findings.push(Error::Cyclic(path));
                return;
            }
            None => {}
        }

        walk.history.insert(key, Visit::InProgress);
        let (constructor, processors) = container.lookup(key);
        match constructor {
            None => {
                let missing = match walk.stack.last() {
                    Some(parent) => format!("{} -> {}", parent.short_name(), key.short_name()),
                    None => key.short_name(),
                };
                walk.findings
                    .push(Error::NotFound(format!("unsatisfied dependency: {missing}")));
            }
            Some(constructor) => {
                walk.stack.push(key);
                self.visit_all(container, &constructor.parameters(), walk);
                for processor in &processors {
                    self.visit_all(container, &processor.parameters(), walk);
                }
                walk.stack.pop();
            }
        }
        walk.history.insert(key, Visit::Done);
    }

    fn visit_all(&self, container: &Container, keys: &[TypeKey], walk: &mut Walk) {
        for &key in keys {
            if key.is_nil() {
                walk.findings
                    .push(Error::Invalid("dependency of nil type".into()));
                continue;
            }
            self.visit(container, key, walk);
        }
    }
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new()
    }
}
