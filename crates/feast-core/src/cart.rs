//! # Cart
//!
//! The single-restaurant shopping cart.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  Page Action              Cart Method             State Change          │
//! │  ───────────              ───────────             ────────────          │
//! │                                                                         │
//! │  Tap "Add" on menu ──────► add_item() ──────────► merge or push line   │
//! │                                 │                                       │
//! │                                 └─ other restaurant? ─► RestaurantConflict
//! │                                                                         │
//! │  Change quantity ────────► set_quantity() ──────► rescale line total   │
//! │                                                                         │
//! │  Tap remove ─────────────► remove_item() ───────► drop line            │
//! │                                                                         │
//! │  Checkout succeeded ─────► clear() ─────────────► empty, no restaurant │
//! │                                                                         │
//! │  Render badge/total ─────► count() / total_amount() (read only)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Either the cart is empty and `restaurant_id` is `None`, or every line
//!   carrying a restaurant id matches `restaurant_id`.
//! - Lines are unique by `(item.id, trimmed note)`.
//! - `line.total` is the line's unit price × `line.quantity`.
//! - A rejected mutation leaves the cart exactly as it was.
//! - `count()` fits in a `u32` and `total_amount()` in an `i64`; a mutation
//!   that would overflow either is rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CartError, ValidationError};
use crate::money::Money;
use crate::types::MenuItem;
use crate::validation::{
    normalize_note, validate_id, validate_line_count, validate_note, validate_positive_amount,
    validate_quantity,
};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY, MAX_NOTE_LEN};

// =============================================================================
// Limits
// =============================================================================

/// Caps applied by the cart on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartLimits {
    /// Maximum number of distinct lines.
    pub max_lines: usize,

    /// Maximum quantity of a single line.
    pub max_quantity: u32,

    /// Maximum note length in characters.
    pub max_note_len: usize,
}

impl Default for CartLimits {
    fn default() -> Self {
        CartLimits {
            max_lines: MAX_CART_LINES,
            max_quantity: MAX_LINE_QUANTITY,
            max_note_len: MAX_NOTE_LEN,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// One row in the cart: a distinct (menu item, customization) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Generated on insertion.
    pub id: String,

    /// Menu item snapshot taken at add time.
    pub item: MenuItem,

    pub quantity: u32,

    /// Trimmed customization note; blank notes are stored as `None`.
    pub note: Option<String>,

    /// Unit price at the latest add × quantity.
    pub total: Money,

    /// Restaurant the line was added from, when the caller said.
    pub restaurant_id: Option<String>,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Unit price implied by the stored total.
    pub fn unit_price(&self) -> Money {
        // Scaling down to one unit never grows the amount
        self.total
            .checked_rescale(self.quantity, 1)
            .unwrap_or(self.total)
    }

    fn matches(&self, item_id: &str, note: Option<&str>) -> bool {
        self.item.id == item_id && self.note.as_deref() == note
    }
}

// =============================================================================
// Cart Candidate
// =============================================================================

/// A line the caller wants to add.
///
/// ## Usage
/// ```rust
/// use feast_core::cart::CartCandidate;
/// use feast_core::money::Money;
/// use feast_core::types::MenuItem;
///
/// let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(5000), "Noodles");
/// let candidate = CartCandidate::new(item, 1)
///     .note("spicy")
///     .total(Money::from_cents(5500)) // +5.00 for the large option
///     .restaurant("r1");
/// assert_eq!(candidate.line_total(), Some(Money::from_cents(5500)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CartCandidate {
    pub item: MenuItem,
    pub quantity: u32,
    pub note: Option<String>,

    /// Caller-priced total; defaults to `item.price × quantity`.
    pub total: Option<Money>,

    pub restaurant_id: Option<String>,
}

impl CartCandidate {
    /// Creates a candidate priced from the menu item.
    pub fn new(item: MenuItem, quantity: u32) -> Self {
        CartCandidate {
            item,
            quantity,
            note: None,
            total: None,
            restaurant_id: None,
        }
    }

    /// Builds a candidate for a catalog item of a known restaurant.
    pub fn from_menu_item(
        item: MenuItem,
        restaurant_id: impl Into<String>,
        quantity: u32,
        note: Option<String>,
    ) -> Self {
        CartCandidate {
            item,
            quantity,
            note,
            total: None,
            restaurant_id: Some(restaurant_id.into()),
        }
    }

    /// Sets the customization note.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Overrides the line total (e.g. after option surcharges).
    pub fn total(mut self, total: Money) -> Self {
        self.total = Some(total);
        self
    }

    /// Sets the originating restaurant.
    pub fn restaurant(mut self, restaurant_id: impl Into<String>) -> Self {
        self.restaurant_id = Some(restaurant_id.into());
        self
    }

    /// The total this candidate contributes, or `None` if `price × quantity`
    /// overflows.
    pub fn line_total(&self) -> Option<Money> {
        match self.total {
            Some(total) => Some(total),
            None => self.item.price.checked_multiply_quantity(self.quantity),
        }
    }
}

// =============================================================================
// Add Outcome
// =============================================================================

/// What `add_item` did with an accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// A new line was appended.
    Added { line_id: String },

    /// The candidate was folded into an existing line.
    Merged { line_id: String, quantity: u32 },
}

impl AddOutcome {
    /// The id of the line that now holds the candidate.
    pub fn line_id(&self) -> &str {
        match self {
            AddOutcome::Added { line_id } | AddOutcome::Merged { line_id, .. } => line_id,
        }
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The shopping cart.
///
/// Fields are private: the only way to change a cart is through its methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartLine>,
    restaurant_id: Option<String>,

    #[serde(skip)]
    limits: CartLimits,
}

impl Cart {
    /// Creates a new empty cart with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty cart with the given limits.
    pub fn with_limits(limits: CartLimits) -> Self {
        Cart {
            items: Vec::new(),
            restaurant_id: None,
            limits,
        }
    }

    /// Adds a candidate line, merging it into an equal line if one exists.
    ///
    /// ## Behavior
    /// - Cart from another restaurant: `Err(RestaurantConflict)`, no change
    /// - Same `(item id, trimmed note)` present: quantities add, and the
    ///   line total becomes the candidate's unit price × the new quantity
    /// - Otherwise: a new line with a fresh id is appended
    /// - The cart adopts the candidate's restaurant if it had none
    ///
    /// ## Errors
    /// `CartError::RestaurantConflict` or `CartError::Invalid`; the cart is
    /// untouched in both cases.
    pub fn add_item(&mut self, candidate: CartCandidate) -> Result<AddOutcome, CartError> {
        let limits = self.limits;

        validate_id("item id", &candidate.item.id)?;
        validate_quantity(candidate.quantity, limits.max_quantity)?;
        validate_positive_amount("price", candidate.item.price)?;
        let total = candidate.line_total().ok_or_else(|| amount_overflow("total"))?;
        validate_positive_amount("total", total)?;
        let note = normalize_note(candidate.note.as_deref());
        validate_note(note.as_deref(), limits.max_note_len)?;

        if let (false, Some(cart), Some(incoming)) = (
            self.items.is_empty(),
            self.restaurant_id.as_deref(),
            candidate.restaurant_id.as_deref(),
        ) {
            if cart != incoming {
                return Err(CartError::RestaurantConflict {
                    cart: cart.to_string(),
                    incoming: incoming.to_string(),
                });
            }
        }

        let incoming_qty = candidate.quantity;
        let restaurant_id = candidate.restaurant_id;

        let existing = self
            .items
            .iter()
            .position(|line| line.matches(&candidate.item.id, note.as_deref()));

        let outcome = match existing {
            Some(index) => {
                let new_qty = self.items[index]
                    .quantity
                    .checked_add(incoming_qty)
                    .ok_or_else(|| quantity_overflow(limits.max_quantity))?;
                validate_quantity(new_qty, limits.max_quantity)?;
                let new_total = total
                    .checked_rescale(incoming_qty, new_qty)
                    .ok_or_else(|| amount_overflow("total"))?;
                self.check_sums(Some(index), new_qty, new_total)?;

                let line = &mut self.items[index];
                line.total = new_total;
                line.quantity = new_qty;
                line.item = candidate.item;
                if line.restaurant_id.is_none() {
                    line.restaurant_id = restaurant_id.clone();
                }

                AddOutcome::Merged {
                    line_id: line.id.clone(),
                    quantity: new_qty,
                }
            }
            None => {
                validate_line_count(self.items.len(), limits.max_lines)?;
                self.check_sums(None, incoming_qty, total)?;

                let line_id = Uuid::new_v4().to_string();
                self.items.push(CartLine {
                    id: line_id.clone(),
                    item: candidate.item,
                    quantity: incoming_qty,
                    note,
                    total,
                    restaurant_id: restaurant_id.clone(),
                    added_at: Utc::now(),
                });

                AddOutcome::Added { line_id }
            }
        };

        if self.restaurant_id.is_none() {
            self.restaurant_id = restaurant_id;
        }

        Ok(outcome)
    }

    /// Removes a line by id.
    ///
    /// Returns false if no such line exists; that is not an error.
    pub fn remove_item(&mut self, line_id: &str) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|line| line.id != line_id);
        let removed = self.items.len() != initial_len;

        if self.items.is_empty() {
            self.restaurant_id = None;
        }

        removed
    }

    /// Sets a line's quantity, keeping its unit price.
    ///
    /// A quantity of 0 removes the line. Returns false if no such line.
    pub fn set_quantity(&mut self, line_id: &str, quantity: u32) -> Result<bool, CartError> {
        if quantity == 0 {
            return Ok(self.remove_item(line_id));
        }

        validate_quantity(quantity, self.limits.max_quantity)?;

        let Some(index) = self.items.iter().position(|line| line.id == line_id) else {
            return Ok(false);
        };

        let line = &self.items[index];
        let new_total = line
            .total
            .checked_rescale(line.quantity, quantity)
            .ok_or_else(|| amount_overflow("total"))?;
        self.check_sums(Some(index), quantity, new_total)?;

        let line = &mut self.items[index];
        line.total = new_total;
        line.quantity = quantity;
        Ok(true)
    }

    /// Checks that the cart count and total still fit once the line at
    /// `index` (or a new line, for `None`) holds `quantity` and `total`.
    fn check_sums(
        &self,
        index: Option<usize>,
        quantity: u32,
        total: Money,
    ) -> Result<(), ValidationError> {
        let others = self
            .items
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != index)
            .map(|(_, line)| line);

        let mut count = quantity;
        let mut amount = total;
        for line in others {
            count = count
                .checked_add(line.quantity)
                .ok_or_else(|| ValidationError::OutOfRange {
                    field: "cart quantity".to_string(),
                    min: 0,
                    max: u32::MAX as i64,
                })?;
            amount = amount
                .checked_add(line.total)
                .ok_or_else(|| amount_overflow("cart total"))?;
        }

        Ok(())
    }

    /// Empties the cart and forgets its restaurant.
    pub fn clear(&mut self) {
        self.items.clear();
        self.restaurant_id = None;
    }

    /// Takes out what an accepted order covered.
    ///
    /// `ordered` is the cart as it was when the order was built. Lines added
    /// since then stay, and a line that grew since keeps only the extra
    /// units. Returns the number of lines removed.
    pub fn settle(&mut self, ordered: &Cart) -> usize {
        let initial_len = self.items.len();

        for placed in ordered.lines() {
            let Some(index) = self.items.iter().position(|line| line.id == placed.id) else {
                continue;
            };

            let line = &mut self.items[index];
            if line.quantity > placed.quantity {
                let remaining = line.quantity - placed.quantity;
                // Shrinking a line never grows its total
                line.total = line
                    .total
                    .checked_rescale(line.quantity, remaining)
                    .unwrap_or(line.total);
                line.quantity = remaining;
            } else {
                self.items.remove(index);
            }
        }

        if self.items.is_empty() {
            self.restaurant_id = None;
        }

        initial_len - self.items.len()
    }

    /// Sum of quantities across all lines.
    pub fn count(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Sum of line totals.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(|line| line.total).sum()
    }

    /// Lines in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.items
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.items.iter().find(|line| line.id == line_id)
    }

    /// The restaurant whose items occupy the cart.
    pub fn restaurant_id(&self) -> Option<&str> {
        self.restaurant_id.as_deref()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn limits(&self) -> CartLimits {
        self.limits
    }

    /// Badge/footer summary for rendering.
    pub fn totals(&self) -> CartTotals {
        CartTotals::from(self)
    }
}

fn amount_overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 1,
        max: i64::MAX,
    }
}

fn quantity_overflow(max_quantity: u32) -> ValidationError {
    ValidationError::OutOfRange {
        field: "quantity".to_string(),
        min: 1,
        max: max_quantity as i64,
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Cart summary for the page header and checkout footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub count: u32,
    pub total_amount: Money,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.len(),
            count: cart.count(),
            total_amount: cart.total_amount(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, price_cents: i64) -> MenuItem {
        MenuItem::new(id, format!("Item {}", id), Money::from_cents(price_cents), "Mains")
    }

    fn assert_consistent(cart: &Cart) {
        let qty: u32 = cart.lines().iter().map(|l| l.quantity).sum();
        let total: i64 = cart.lines().iter().map(|l| l.total.cents()).sum();
        assert_eq!(cart.count(), qty);
        assert_eq!(cart.total_amount().cents(), total);
        if cart.is_empty() {
            assert_eq!(cart.restaurant_id(), None);
        }
        if let Some(rid) = cart.restaurant_id() {
            for line in cart.lines() {
                if let Some(line_rid) = line.restaurant_id.as_deref() {
                    assert_eq!(line_rid, rid);
                }
            }
        }
    }

    #[test]
    fn test_add_item_defaults_total_from_price() {
        let mut cart = Cart::new();
        let outcome = cart
            .add_item(CartCandidate::new(item("m1", 50), 2).restaurant("r1"))
            .unwrap();

        assert!(matches!(outcome, AddOutcome::Added { .. }));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.lines()[0].total.cents(), 100);
        assert_eq!(cart.restaurant_id(), Some("r1"));
    }

    #[test]
    fn test_same_item_and_note_merges() {
        let mut cart = Cart::new();
        let mut last_line = String::new();

        for _ in 0..5 {
            let outcome = cart
                .add_item(CartCandidate::new(item("m1", 120), 1).note(" extra egg "))
                .unwrap();
            last_line = outcome.line_id().to_string();
        }

        assert_eq!(cart.len(), 1);
        let line = cart.line(&last_line).unwrap();
        assert_eq!(line.quantity, 5);
        assert_eq!(line.total.cents(), 600);
        assert_eq!(line.note.as_deref(), Some("extra egg"));
    }

    #[test]
    fn test_merge_uses_latest_unit_price() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 2)).unwrap();

        // Same item now priced 60 per unit (option change)
        let outcome = cart
            .add_item(CartCandidate::new(item("m1", 50), 1).total(Money::from_cents(60)))
            .unwrap();

        assert_eq!(
            outcome,
            AddOutcome::Merged {
                line_id: cart.lines()[0].id.clone(),
                quantity: 3
            }
        );
        assert_eq!(cart.lines()[0].total.cents(), 180);
        assert_eq!(cart.lines()[0].unit_price().cents(), 60);
    }

    #[test]
    fn test_different_note_is_distinct_line() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).note("spicy")).unwrap();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).note("mild")).unwrap();
        cart.add_item(CartCandidate::new(item("m1", 50), 1)).unwrap();

        assert_eq!(cart.len(), 3);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn test_blank_note_merges_with_no_note() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1)).unwrap();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).note("   ")).unwrap();

        assert_eq!(cart.len(), 1);
        assert_eq!(cart.count(), 2);
    }

    #[test]
    fn test_restaurant_guard_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 2).restaurant("A")).unwrap();
        let before = cart.clone();

        let err = cart
            .add_item(CartCandidate::new(item("m9", 70), 1).restaurant("B"))
            .unwrap_err();

        assert_eq!(
            err,
            CartError::RestaurantConflict {
                cart: "A".to_string(),
                incoming: "B".to_string()
            }
        );
        assert_eq!(cart.lines(), before.lines());
        assert_eq!(cart.restaurant_id(), before.restaurant_id());
    }

    #[test]
    fn test_candidate_without_restaurant_is_accepted() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).restaurant("A")).unwrap();
        cart.add_item(CartCandidate::new(item("m2", 50), 1)).unwrap();

        assert_eq!(cart.len(), 2);
        assert_eq!(cart.restaurant_id(), Some("A"));
    }

    #[test]
    fn test_cart_adopts_restaurant_when_unset() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1)).unwrap();
        assert_eq!(cart.restaurant_id(), None);

        cart.add_item(CartCandidate::new(item("m2", 50), 1).restaurant("A")).unwrap();
        assert_eq!(cart.restaurant_id(), Some("A"));
    }

    #[test]
    fn test_invalid_candidates_rejected() {
        let mut cart = Cart::new();

        let zero_qty = cart.add_item(CartCandidate::new(item("m1", 50), 0));
        assert!(matches!(zero_qty, Err(CartError::Invalid(_))));

        let free = cart.add_item(CartCandidate::new(item("m1", 0), 1));
        assert!(matches!(free, Err(CartError::Invalid(_))));

        let long_note = cart.add_item(CartCandidate::new(item("m1", 50), 1).note("x".repeat(500)));
        assert!(matches!(long_note, Err(CartError::Invalid(_))));

        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id(), None);
    }

    #[test]
    fn test_merge_respects_quantity_cap() {
        let mut cart = Cart::with_limits(CartLimits {
            max_quantity: 3,
            ..CartLimits::default()
        });
        cart.add_item(CartCandidate::new(item("m1", 50), 2)).unwrap();

        let err = cart.add_item(CartCandidate::new(item("m1", 50), 2)).unwrap_err();
        assert!(matches!(err, CartError::Invalid(_)));
        assert_eq!(cart.count(), 2);
        assert_eq!(cart.total_amount().cents(), 100);
    }

    #[test]
    fn test_price_overflow_is_rejected() {
        let mut cart = Cart::new();

        let err = cart
            .add_item(CartCandidate::new(item("m1", i64::MAX / 2), 3))
            .unwrap_err();
        assert!(matches!(err, CartError::Invalid(ValidationError::OutOfRange { .. })));
        assert!(cart.is_empty());

        // Each line fits on its own, the cart total would not
        cart.add_item(CartCandidate::new(item("m1", i64::MAX / 2), 2)).unwrap();
        let err = cart.add_item(CartCandidate::new(item("m2", 10), 1)).unwrap_err();
        assert!(matches!(err, CartError::Invalid(ValidationError::OutOfRange { .. })));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.total_amount().cents(), i64::MAX - 1);
    }

    #[test]
    fn test_quantity_overflow_is_rejected() {
        let mut cart = Cart::with_limits(CartLimits {
            max_quantity: u32::MAX,
            ..CartLimits::default()
        });
        let added = cart
            .add_item(CartCandidate::new(item("m1", 1), u32::MAX))
            .unwrap();

        let err = cart.add_item(CartCandidate::new(item("m1", 1), 1)).unwrap_err();
        assert!(matches!(err, CartError::Invalid(_)));
        assert_eq!(cart.count(), u32::MAX);

        let err = cart.add_item(CartCandidate::new(item("m2", 1), 1)).unwrap_err();
        assert!(matches!(err, CartError::Invalid(_)));
        assert_eq!(cart.len(), 1);

        assert!(cart.set_quantity(added.line_id(), 2).unwrap());
        assert_eq!(cart.line(added.line_id()).unwrap().total.cents(), 2);
        assert_consistent(&cart);
    }

    #[test]
    fn test_set_quantity_overflow_keeps_line() {
        let mut cart = Cart::new();
        let added = cart
            .add_item(CartCandidate::new(item("m1", i64::MAX / 4), 1))
            .unwrap();

        let err = cart.set_quantity(added.line_id(), 5).unwrap_err();
        assert!(matches!(err, CartError::Invalid(_)));
        let line = cart.line(added.line_id()).unwrap();
        assert_eq!(line.quantity, 1);
        assert_eq!(line.total.cents(), i64::MAX / 4);
    }

    #[test]
    fn test_line_count_cap() {
        let mut cart = Cart::with_limits(CartLimits {
            max_lines: 2,
            ..CartLimits::default()
        });
        cart.add_item(CartCandidate::new(item("m1", 50), 1)).unwrap();
        cart.add_item(CartCandidate::new(item("m2", 50), 1)).unwrap();

        assert!(cart.add_item(CartCandidate::new(item("m3", 50), 1)).is_err());
        // Merging into an existing line still works at the cap
        assert!(cart.add_item(CartCandidate::new(item("m2", 50), 1)).is_ok());
    }

    #[test]
    fn test_remove_last_line_resets_restaurant() {
        let mut cart = Cart::new();
        let a = cart
            .add_item(CartCandidate::new(item("m1", 50), 1).restaurant("r1"))
            .unwrap();
        let b = cart
            .add_item(CartCandidate::new(item("m2", 80), 1).restaurant("r1"))
            .unwrap();

        assert!(cart.remove_item(a.line_id()));
        assert_eq!(cart.restaurant_id(), Some("r1"));

        assert!(cart.remove_item(b.line_id()));
        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id(), None);

        // A different restaurant is welcome again
        assert!(cart
            .add_item(CartCandidate::new(item("x1", 10), 1).restaurant("r2"))
            .is_ok());
    }

    #[test]
    fn test_remove_missing_line_is_noop() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).restaurant("r1")).unwrap();

        assert!(!cart.remove_item("no-such-line"));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.restaurant_id(), Some("r1"));
    }

    #[test]
    fn test_set_quantity_rescales_total() {
        let mut cart = Cart::new();
        let added = cart
            .add_item(CartCandidate::new(item("m1", 50), 2).total(Money::from_cents(130)))
            .unwrap();

        assert!(cart.set_quantity(added.line_id(), 4).unwrap());
        assert_eq!(cart.line(added.line_id()).unwrap().total.cents(), 260);

        assert!(cart.set_quantity(added.line_id(), 0).unwrap());
        assert!(cart.is_empty());
        assert!(!cart.set_quantity("missing", 2).unwrap());
    }

    #[test]
    fn test_settle_keeps_what_was_not_ordered() {
        let mut cart = Cart::new();
        let pad_thai = cart
            .add_item(CartCandidate::new(item("m1", 50), 2).restaurant("r1"))
            .unwrap();
        let tea = cart
            .add_item(CartCandidate::new(item("m2", 30), 1).restaurant("r1"))
            .unwrap();
        let ordered = cart.clone();

        // While the order is in flight: one more Pad Thai and a new line
        cart.add_item(CartCandidate::new(item("m1", 50), 1).restaurant("r1"))
            .unwrap();
        let rice = cart
            .add_item(CartCandidate::new(item("m3", 20), 1).restaurant("r1"))
            .unwrap();

        assert_eq!(cart.settle(&ordered), 1);

        assert!(cart.line(tea.line_id()).is_none());
        let left = cart.line(pad_thai.line_id()).unwrap();
        assert_eq!(left.quantity, 1);
        assert_eq!(left.total.cents(), 50);
        assert!(cart.line(rice.line_id()).is_some());
        assert_eq!(cart.restaurant_id(), Some("r1"));
        assert_consistent(&cart);
    }

    #[test]
    fn test_settle_unchanged_cart_empties_it() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 2).restaurant("r1"))
            .unwrap();
        let ordered = cart.clone();

        assert_eq!(cart.settle(&ordered), 1);
        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id(), None);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 2).restaurant("r1")).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.restaurant_id(), None);
        assert_eq!(
            cart.totals(),
            CartTotals {
                line_count: 0,
                count: 0,
                total_amount: Money::zero(),
            }
        );
    }

    #[test]
    fn test_totals_stay_consistent_over_mixed_operations() {
        let mut cart = Cart::new();
        let restaurants = ["r1", "r1", "r1", "r2"];
        let notes = [None, Some("spicy"), Some(" spicy"), Some("no egg")];
        let mut seed: u64 = 0x5eed;

        for step in 0..400 {
            // Small LCG keeps the sequence deterministic
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let r = (seed >> 33) as usize;

            match r % 10 {
                0..=5 => {
                    let menu_item = item(&format!("m{}", r % 4), 40 + (r % 3) as i64 * 10);
                    let mut candidate = CartCandidate::new(menu_item, 1 + (r % 2) as u32)
                        .restaurant(restaurants[r % restaurants.len()]);
                    if let Some(note) = notes[(r / 7) % notes.len()] {
                        candidate = candidate.note(note);
                    }
                    let _ = cart.add_item(candidate);
                }
                6 | 7 => {
                    if let Some(id) = cart.lines().get(r % (cart.len() + 1)).map(|l| l.id.clone()) {
                        cart.remove_item(&id);
                    }
                }
                8 => {
                    if let Some(id) = cart.lines().first().map(|l| l.id.clone()) {
                        let _ = cart.set_quantity(&id, (r % 5) as u32);
                    }
                }
                _ => {
                    if step % 3 == 0 {
                        cart.clear();
                    }
                }
            }

            assert_consistent(&cart);
        }
    }

    #[test]
    fn test_end_to_end_cart_scenario() {
        let mut cart = Cart::new();
        let m1 = item("m1", 50);

        cart.add_item(CartCandidate::new(m1.clone(), 2).restaurant("r1")).unwrap();
        assert_eq!(cart.total_amount().cents(), 100);

        cart.add_item(CartCandidate::new(m1.clone(), 1).note("spicy").restaurant("r1"))
            .unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total_amount().cents(), 150);

        let err = cart
            .add_item(CartCandidate::new(item("z1", 90), 1).restaurant("r2"))
            .unwrap_err();
        assert!(err.is_conflict());
        assert_eq!(cart.count(), 3);
        assert_eq!(cart.total_amount().cents(), 150);
    }

    #[test]
    fn test_cart_serializes_for_front_end() {
        let mut cart = Cart::new();
        cart.add_item(CartCandidate::new(item("m1", 50), 1).restaurant("r1")).unwrap();

        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value["restaurantId"], "r1");
        assert_eq!(value["items"][0]["quantity"], 1);
        assert!(value.get("limits").is_none());
    }
}
