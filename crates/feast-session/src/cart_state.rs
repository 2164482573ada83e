//! # Cart State
//!
//! Shared handle to the customer's cart.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>` because:
//! 1. Menu pages, the cart drawer and checkout all hold a handle
//! 2. Only one caller should modify the cart at a time
//! 3. Every reader must see the most recent completed mutation
//!
//! ## Why Not RwLock?
//! Cart operations are short and most of them write. The lock is never held
//! across an `.await`: `add_from_catalog` resolves the menu item first and
//! only then locks.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use feast_core::{AddOutcome, Cart, CartCandidate, CartError, CartLimits, CartTotals, CoreError};

use crate::error::SessionResult;
use crate::source::Catalog;

/// Shared cart handle. Clones refer to the same cart.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    /// Creates an empty cart with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cart with the given limits.
    pub fn with_limits(limits: CartLimits) -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::with_limits(limits))),
        }
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let badge = cart_state.with_cart(|cart| cart.count());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        f(&self.lock())
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// cart_state.with_cart_mut(|cart| cart.add_item(candidate))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        f(&mut self.lock())
    }

    pub fn add_item(&self, candidate: CartCandidate) -> Result<AddOutcome, CartError> {
        let result = self.with_cart_mut(|cart| cart.add_item(candidate));
        match &result {
            Ok(outcome) => debug!(line_id = outcome.line_id(), "Cart line added"),
            Err(e) => info!(error = %e, "Cart add rejected"),
        }
        result
    }

    pub fn remove_item(&self, line_id: &str) -> bool {
        self.with_cart_mut(|cart| cart.remove_item(line_id))
    }

    pub fn set_quantity(&self, line_id: &str, quantity: u32) -> Result<bool, CartError> {
        self.with_cart_mut(|cart| cart.set_quantity(line_id, quantity))
    }

    pub fn clear(&self) {
        self.with_cart_mut(Cart::clear);
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(Cart::totals)
    }

    /// A copy of the cart as it is now.
    pub fn snapshot(&self) -> Cart {
        self.with_cart(Cart::clone)
    }

    /// Looks up `item_id` on the restaurant's menu and adds it.
    ///
    /// ## Errors
    /// - Catalog failures are passed through
    /// - `CoreError::MenuItemNotFound` if the menu has no such item
    /// - Cart errors (`RestaurantConflict`, `Invalid`) as from `add_item`
    pub async fn add_from_catalog<C>(
        &self,
        catalog: &C,
        restaurant_id: &str,
        item_id: &str,
        quantity: u32,
        note: Option<String>,
    ) -> SessionResult<AddOutcome>
    where
        C: Catalog + ?Sized,
    {
        let menu = catalog.menu(restaurant_id).await?;
        let item = menu
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| CoreError::MenuItemNotFound {
                restaurant_id: restaurant_id.to_string(),
                item_id: item_id.to_string(),
            })?;

        let candidate = CartCandidate::from_menu_item(item, restaurant_id, quantity, note);
        Ok(self.add_item(candidate)?)
    }

    /// Poisoning only means a panic happened mid-closure; cart methods never
    /// leave a half-applied change, so the data is still usable.
    fn lock(&self) -> MutexGuard<'_, Cart> {
        self.cart.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::mock::MemoryCatalog;
    use feast_core::{MenuItem, Money};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_menu(
                "r1",
                vec![
                    MenuItem::new("m1", "Pad Thai", Money::from_cents(50), "Noodles"),
                    MenuItem::new("m2", "Thai Tea", Money::from_cents(30), "Drinks"),
                ],
            )
            .with_menu(
                "r2",
                vec![MenuItem::new("z1", "Burger", Money::from_cents(90), "Mains")],
            )
    }

    #[test]
    fn test_clones_share_the_cart() {
        let state = CartState::new();
        let other = state.clone();
        let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(50), "Noodles");

        state
            .add_item(CartCandidate::new(item, 2).restaurant("r1"))
            .unwrap();

        assert_eq!(other.totals().count, 2);
        assert_eq!(other.snapshot().restaurant_id(), Some("r1"));

        other.clear();
        assert!(state.with_cart(Cart::is_empty));
    }

    #[test]
    fn test_limits_apply() {
        let state = CartState::with_limits(CartLimits {
            max_quantity: 2,
            ..CartLimits::default()
        });
        let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(50), "Noodles");

        assert!(state.add_item(CartCandidate::new(item, 3)).is_err());
        assert!(state.snapshot().is_empty());
    }

    #[test]
    fn test_set_quantity_and_remove() {
        let state = CartState::new();
        let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(50), "Noodles");
        let added = state.add_item(CartCandidate::new(item, 1)).unwrap();

        assert!(state.set_quantity(added.line_id(), 3).unwrap());
        assert_eq!(state.totals().total_amount.cents(), 150);

        assert!(state.remove_item(added.line_id()));
        assert!(!state.remove_item(added.line_id()));
    }

    #[tokio::test]
    async fn test_add_from_catalog() {
        let state = CartState::new();
        let catalog = catalog();

        state
            .add_from_catalog(&catalog, "r1", "m1", 2, None)
            .await
            .unwrap();
        let outcome = state
            .add_from_catalog(&catalog, "r1", "m1", 1, Some("  ".into()))
            .await
            .unwrap();

        assert!(matches!(outcome, AddOutcome::Merged { quantity: 3, .. }));
        assert_eq!(state.totals().total_amount.cents(), 150);
    }

    #[tokio::test]
    async fn test_add_from_catalog_errors() {
        let state = CartState::new();
        let catalog = catalog();

        let missing = state
            .add_from_catalog(&catalog, "r1", "nope", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(
            missing,
            SessionError::Core(CoreError::MenuItemNotFound { .. })
        ));

        let unknown = state
            .add_from_catalog(&catalog, "r9", "m1", 1, None)
            .await
            .unwrap_err();
        assert!(matches!(unknown, SessionError::NotFound(_)));

        state
            .add_from_catalog(&catalog, "r1", "m2", 1, None)
            .await
            .unwrap();
        let conflict = state
            .add_from_catalog(&catalog, "r2", "z1", 1, None)
            .await
            .unwrap_err();
        assert!(conflict.is_cart_conflict());
        assert_eq!(state.totals().count, 1);
    }
}
