use crate::model::{ProductId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Type-safe identifier for Orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u32);

impl From<u32> for OrderId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// A placed order. The total is fixed at placement time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub total: f64,
}

/// Payload for placing an order.
///
/// Each request is injected into its own sub-scope, so it is never built by
/// a constructor.
#[derive(Debug, Clone)]
pub struct OrderCreate {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}
