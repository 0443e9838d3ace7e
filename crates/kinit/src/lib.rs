//! # kinit
//!
//! Type-directed dependency injection with scoped lifetimes and ordered
//! teardown.
//!
//! Objects are identified by their type. A [`Container`] holds, per type, one
//! [`Constructor`] that knows how to build it and any number of
//! [`Processor`]s that post-process it. Work is expressed as [`Functor`]s:
//! activities that declare the types they need. Running functors resolves
//! their dependencies depth-first, builds each type at most once, and caches
//! everything in an [`Arena`] that destroys its objects in reverse creation
//! order when the run ends.
//!
//! ## Architecture Overview
//!
//! 1. **Identity** ([`TypeKey`], [`Object`]) - what a dependency is
//! 2. **Contracts** ([`Constructor`], [`Processor`], [`Functor`]) - how objects are made and consumed
//! 3. **Lifetime** ([`Arena`], [`Destructor`]) - where objects live and how they die
//! 4. **Resolution** ([`Container`], [`Runtime`]) - turning parameter lists into objects
//! 5. **Tooling** ([`Inspector`], [`Declaration`], [`global`], [`mock`]) - checking and organizing registrations
//!
//! ## Example
//!
//! ```rust
//! use kinit::{constructor, functor, Container};
//! use std::rc::Rc;
//! use std::sync::{Arc, Mutex};
//!
//! struct Config { url: String }
//! struct Connection { url: String }
//!
//! let events = Arc::new(Mutex::new(Vec::new()));
//! let closed = Arc::clone(&events);
//!
//! let container = Container::new();
//! container
//!     .provide(constructor(|()| Ok(Config { url: "db://local".into() })))
//!     .unwrap();
//! container
//!     .provide(
//!         constructor(|(config,): (Rc<Config>,)| Ok(Connection { url: config.url.clone() }))
//!             .on_teardown(move |conn: &Connection| {
//!                 closed.lock().unwrap().push(format!("closed {}", conn.url));
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! let used = Arc::clone(&events);
//! container
//!     .run([functor(move |(conn,): (Rc<Connection>,)| {
//!         used.lock().unwrap().push(format!("query {}", conn.url));
//!         Ok(())
//!     })])
//!     .unwrap();
//!
//! assert_eq!(
//!     *events.lock().unwrap(),
//!     vec!["query db://local", "closed db://local"]
//! );
//! ```
//!
//! ## Scopes
//!
//! Each [`Container::run`] gets its own arena, so objects never leak from one
//! run into the next. Inside a run, a functor that depends on [`Runtime`] can
//! start nested runs whose arenas see the outer objects and are torn down
//! first. See the [`runtime`] module.
//!
//! ## Threading
//!
//! Registration is thread-safe and a `Container` can be shared freely.
//! Objects are `Rc`-based and stay on the thread that runs them.
//!
//! ## Testing
//!
//! The [`mock`] module provides scripted constructors, processors and
//! functors that record what the container did with them.

pub mod adapter;
pub mod arena;
pub mod container;
pub mod contract;
pub mod declaration;
pub mod destructor;
pub mod error;
pub mod global;
pub mod inspect;
pub mod key;
pub mod mock;
pub mod runtime;
pub mod tracing;

// Re-export core types for convenience
pub use adapter::{constructor, functor, injector, opener, processor, Close, Dependencies, Further};
pub use arena::Arena;
pub use container::Container;
pub use contract::{Constructor, Functor, Processor};
pub use declaration::Declaration;
pub use destructor::Destructor;
pub use error::{Error, ErrorKind};
pub use inspect::{InspectOptions, Inspector};
pub use key::{Object, TypeKey};
pub use runtime::Runtime;
