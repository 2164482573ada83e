//! # Collaborator Contracts
//!
//! The async services the client core talks to. The front end wires HTTP
//! clients behind these traits; tests and the demo use the in-memory
//! versions from [`crate::mock`].
//!
//! ```text
//! ┌──────────────┐      ┌──────────────────────────────────────────────┐
//! │ RiderSession │─────►│ WorkSource                                   │
//! │              │      │  get_active / pull_next / set_availability   │
//! │              │      │  start / complete / get_queue_count          │
//! └──────────────┘      └──────────────────────────────────────────────┘
//! ┌──────────────┐      ┌──────────────────────────────────────────────┐
//! │ CartState    │─────►│ Catalog::menu(restaurant_id)                 │
//! └──────────────┘      └──────────────────────────────────────────────┘
//! ┌──────────────┐      ┌──────────────────────────────────────────────┐
//! │ CheckoutFlow │─────►│ Checkout::place_order(&OrderRequest)         │
//! └──────────────┘      └──────────────────────────────────────────────┘
//! ```
//!
//! Every method may fail with a [`crate::SessionError`]; callers never retry
//! inside an operation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use feast_core::{Availability, Cart, CoreError, CoreResult, MenuItem, Money, RiderWork};

use crate::error::SessionResult;

// =============================================================================
// Work Source
// =============================================================================

/// The rider job API.
#[async_trait]
pub trait WorkSource: Send + Sync + 'static {
    /// The job currently held by this rider, if any.
    async fn get_active(&self) -> SessionResult<Option<RiderWork>>;

    /// Asks the server to assign the next queued job.
    async fn pull_next(&self) -> SessionResult<Option<RiderWork>>;

    /// Reports the rider's online toggle.
    async fn set_availability(&self, availability: Availability) -> SessionResult<()>;

    /// Acknowledges pickup of an assigned job.
    async fn start(&self, job_id: &str) -> SessionResult<()>;

    /// Acknowledges delivery of an in-progress job.
    async fn complete(&self, job_id: &str) -> SessionResult<()>;

    /// Advisory count of jobs waiting to be assigned.
    async fn get_queue_count(&self) -> SessionResult<u32>;
}

// =============================================================================
// Catalog
// =============================================================================

/// Restaurant menus.
#[async_trait]
pub trait Catalog: Send + Sync + 'static {
    async fn menu(&self, restaurant_id: &str) -> SessionResult<Vec<MenuItem>>;
}

// =============================================================================
// Checkout
// =============================================================================

/// Order placement.
#[async_trait]
pub trait Checkout: Send + Sync + 'static {
    async fn place_order(&self, order: &OrderRequest) -> SessionResult<OrderReceipt>;
}

/// One cart line as sent to the order endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub item_id: String,
    pub quantity: u32,
    pub note: Option<String>,
    pub total: Money,
}

/// The order body built from a cart snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub restaurant_id: Option<String>,
    pub lines: Vec<OrderLine>,
    pub total: Money,
}

impl OrderRequest {
    /// Builds an order from the cart's current lines.
    ///
    /// ## Errors
    /// `CoreError::EmptyCart` when there is nothing to order.
    pub fn from_cart(cart: &Cart) -> CoreResult<Self> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        let lines = cart
            .lines()
            .iter()
            .map(|line| OrderLine {
                item_id: line.item.id.clone(),
                quantity: line.quantity,
                note: line.note.clone(),
                total: line.total,
            })
            .collect();

        Ok(OrderRequest {
            restaurant_id: cart.restaurant_id().map(str::to_string),
            lines,
            total: cart.total_amount(),
        })
    }
}

/// What the order endpoint answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    pub order_id: String,
    pub total: Money,
}
