//! # Order Desk
//!
//! A small order-taking desk assembled entirely by the `kinit` container.
//!
//! - **[config]**: [`Settings`](config::Settings) read from `ORDER_DESK_*` variables
//! - **[model]**: plain data ([`User`](model::User), [`Product`](model::Product), [`Order`](model::Order))
//! - **[services]**: the objects the container builds, including the tokio-backed [`Notifier`](services::Notifier)
//! - **[lifecycle]**: wiring, per-request sub-scopes and the demo session
//!
//! This library exposes those modules for the binary and for integration testing.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod model;
pub mod services;

pub use error::DeskError;
