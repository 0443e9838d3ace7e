//! Error types for the order desk.

use crate::model::{ProductId, UserId};
use thiserror::Error;

/// Errors raised by the desk's services.
///
/// They reach callers wrapped in [`kinit::Error::Custom`]; use
/// [`kinit::Error::downcast_custom`] to get them back.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeskError {
    /// Settings could not be read or failed validation.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("User not found: {0}")]
    UnknownUser(UserId),

    #[error("Product not found: {0}")]
    UnknownProduct(ProductId),

    /// The requested quantity exceeds the available stock.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// Zero, or more than a single order may carry.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u32),

    #[error("Notification failed: {0}")]
    Notification(String),
}

impl From<DeskError> for kinit::Error {
    fn from(e: DeskError) -> Self {
        kinit::Error::custom(e)
    }
}
