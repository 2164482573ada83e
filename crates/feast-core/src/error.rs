//! # Error Types
//!
//! Domain-specific error types for feast-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  feast-core errors (this file)                                         │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── CartError        - Cart rejections (conflict or invalid input)    │
//! │  └── CoreError        - Umbrella for callers that mix both             │
//! │                                                                         │
//! │  feast-session errors (separate crate)                                 │
//! │  └── SessionError     - Collaborator, storage and config failures      │
//! │                                                                         │
//! │  Flow: ValidationError → CartError → CoreError → SessionError → page   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Cart Error
// =============================================================================

/// Reasons a cart mutation was refused. The cart is unchanged in every case.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The cart already holds lines from another restaurant.
    ///
    /// ## User Workflow
    /// ```text
    /// Cart: 3 items from "r1"
    ///      │
    ///      ▼
    /// add_item(restaurant "r2")
    ///      │
    ///      ▼
    /// RestaurantConflict { cart: "r1", incoming: "r2" }
    ///      │
    ///      ▼
    /// Page asks: "Clear cart and add this item instead?"
    /// ```
    #[error("Cart holds items from restaurant {cart}; cannot add an item from {incoming}")]
    RestaurantConflict { cart: String, incoming: String },

    /// The candidate line failed validation.
    #[error("Invalid cart line: {0}")]
    Invalid(#[from] ValidationError),
}

impl CartError {
    /// Returns true if this is a cross-restaurant conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CartError::RestaurantConflict { .. })
    }
}

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Menu item cannot be found in the restaurant's catalog.
    #[error("Menu item {item_id} not found for restaurant {restaurant_id}")]
    MenuItemNotFound {
        restaurant_id: String,
        item_id: String,
    },

    /// Checkout attempted with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart rejected the mutation.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_message() {
        let err = CartError::RestaurantConflict {
            cart: "r1".to_string(),
            incoming: "r2".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cart holds items from restaurant r1; cannot add an item from r2"
        );
        assert!(err.is_conflict());
    }

    #[test]
    fn test_validation_converts_to_cart_error() {
        let err: CartError = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        }
        .into();
        assert!(!err.is_conflict());
        assert_eq!(err.to_string(), "Invalid cart line: quantity must be positive");
    }

    #[test]
    fn test_cart_error_is_transparent_in_core_error() {
        let err: CoreError = CartError::RestaurantConflict {
            cart: "a".to_string(),
            incoming: "b".to_string(),
        }
        .into();
        assert!(matches!(err, CoreError::Cart(_)));
        assert!(err.to_string().starts_with("Cart holds items"));
    }
}
