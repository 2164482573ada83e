//! # Validation Module
//!
//! Input rules checked before the cart mutates.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Page form (TypeScript)                                       │
//! │  ├── Quantity stepper never goes below 1                               │
//! │  └── Immediate user feedback                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── quantity within limits                                            │
//! │  ├── price and total positive                                          │
//! │  └── note length                                                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Server (checkout)                                            │
//! │  └── Re-prices the order authoritatively                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use feast_core::validation::{normalize_note, validate_quantity};
//!
//! validate_quantity(2, 99).unwrap();
//! assert_eq!(normalize_note(Some("  spicy ")), Some("spicy".to_string()));
//! assert_eq!(normalize_note(Some("   ")), None);
//! ```

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be at least 1
/// - Must not exceed `max`
pub fn validate_quantity(qty: u32, max: u32) -> ValidationResult<()> {
    if qty == 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > max {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: max as i64,
        });
    }

    Ok(())
}

/// Validates that an amount is strictly positive.
///
/// Used for unit prices and caller-supplied line totals.
pub fn validate_positive_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates that the cart can take one more line.
pub fn validate_line_count(current_lines: usize, max: usize) -> ValidationResult<()> {
    if current_lines >= max {
        return Err(ValidationError::OutOfRange {
            field: "cart lines".to_string(),
            min: 0,
            max: max as i64,
        });
    }

    Ok(())
}

/// Validates an identifier is present.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Note Handling
// =============================================================================

/// Trims a customization note; blank notes become `None`.
///
/// Two lines merge only when their normalized notes are equal, so `None`,
/// `""` and `"   "` all describe the same plain line.
pub fn normalize_note(note: Option<&str>) -> Option<String> {
    note.map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

/// Validates a normalized note length (counted in characters).
pub fn validate_note(note: Option<&str>, max: usize) -> ValidationResult<()> {
    match note {
        Some(n) if n.chars().count() > max => Err(ValidationError::TooLong {
            field: "note".to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
