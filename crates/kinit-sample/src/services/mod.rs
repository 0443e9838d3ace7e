//! # Services
//!
//! The objects the container builds and wires together. None of them knows
//! about the container: each takes its dependencies as `Rc` handles and uses
//! interior mutability for its own state.
//!
//! ```text
//! Settings ──┬─> Catalog ───────┐
//!            ├─> Notifier ──────┼─> OrderBook
//!            └──────────────────┤
//!              UserDirectory ───┘
//! ```

pub mod catalog;
pub mod notifier;
pub mod orders;
pub mod users;

pub use catalog::*;
pub use notifier::*;
pub use orders::*;
pub use users::*;
