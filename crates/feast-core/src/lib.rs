//! # feast-core: Pure Business Logic for Feast
//!
//! This crate holds the I/O-free part of the Feast front end: integer money,
//! menu item snapshots and the single-restaurant shopping cart.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Feast Client Architecture                       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Pages (web front end)                        │   │
//! │  │    Menu ──► Cart ──► Checkout          Rider Work screen        │   │
//! │  └──────────────┬──────────────────────────────────┬───────────────┘   │
//! │                 │                                  │                    │
//! │  ┌──────────────▼───────────────┐  ┌───────────────▼───────────────┐   │
//! │  │   ★ feast-core (THIS) ★      │  │        feast-session          │   │
//! │  │                              │  │                               │   │
//! │  │   Money • MenuItem • Cart    │◄─┤  CartState • CheckoutFlow     │   │
//! │  │                              │  │  RiderSession • poll loop     │   │
//! │  │   NO I/O • PURE FUNCTIONS    │  │  SessionStore • WorkSource    │   │
//! │  └──────────────────────────────┘  └───────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer money (minor units, never floats)
//! - [`types`] - Menu items and rider work records
//! - [`cart`] - The cart manager: merging, restaurant guard, totals
//! - [`validation`] - Input rules applied before the cart mutates
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use feast_core::cart::{Cart, CartCandidate};
//! use feast_core::money::Money;
//! use feast_core::types::MenuItem;
//!
//! let pad_thai = MenuItem::new("m1", "Pad Thai", Money::from_cents(5000), "Noodles");
//!
//! let mut cart = Cart::new();
//! cart.add_item(CartCandidate::new(pad_thai, 2).restaurant("r1")).unwrap();
//!
//! assert_eq!(cart.count(), 2);
//! assert_eq!(cart.total_amount().cents(), 10000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{AddOutcome, Cart, CartCandidate, CartLimits, CartLine, CartTotals};
pub use error::{CartError, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default maximum number of distinct lines in a cart.
///
/// Carts are small (tens of lines); the cap keeps a runaway page from
/// growing one without bound.
pub const MAX_CART_LINES: usize = 50;

/// Default maximum quantity of a single cart line.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Default maximum length (in characters) of a line customization note.
pub const MAX_NOTE_LEN: usize = 200;
