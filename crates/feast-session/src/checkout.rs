//! # Checkout Flow
//!
//! Turns the cart into an order.
//!
//! ```text
//! snapshot cart ──► empty? ──yes──► Err(EmptyCart)
//!                     │
//!                     no
//!                     ▼
//!              place_order(&OrderRequest) ──Err──► cart untouched
//!                     │
//!                    Ok
//!                     ▼
//!          cart.settle(&snapshot) ──► OrderReceipt
//! ```
//!
//! The cart stays usable while the order is in flight. Settling removes only
//! the units that went into the order, so lines added meanwhile survive.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cart_state::CartState;
use crate::error::SessionResult;
use crate::source::{Checkout, OrderReceipt, OrderRequest};

/// Places orders for a shared cart.
pub struct CheckoutFlow<C: Checkout> {
    checkout: Arc<C>,
    cart: CartState,
}

impl<C: Checkout> CheckoutFlow<C> {
    pub fn new(checkout: Arc<C>, cart: CartState) -> Self {
        CheckoutFlow { checkout, cart }
    }

    pub fn cart(&self) -> &CartState {
        &self.cart
    }

    /// Submits the current cart and removes the ordered lines once the
    /// order is accepted.
    pub async fn checkout(&self) -> SessionResult<OrderReceipt> {
        let ordered = self.cart.snapshot();
        let order = OrderRequest::from_cart(&ordered)?;

        let receipt = match self.checkout.place_order(&order).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, lines = order.lines.len(), "Order placement failed");
                return Err(e);
            }
        };

        let (removed, kept) = self
            .cart
            .with_cart_mut(|cart| (cart.settle(&ordered), cart.len()));
        info!(
            order_id = %receipt.order_id,
            total = %receipt.total,
            restaurant_id = ?order.restaurant_id,
            removed,
            kept,
            "Order placed"
        );

        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::mock::MemoryCheckout;
    use async_trait::async_trait;
    use feast_core::{CartCandidate, CoreError, MenuItem, Money};

    /// Adds a line to the cart while the order is being placed.
    struct BusyCustomer {
        cart: CartState,
        inner: MemoryCheckout,
    }

    #[async_trait]
    impl Checkout for BusyCustomer {
        async fn place_order(&self, order: &OrderRequest) -> SessionResult<OrderReceipt> {
            let tea = MenuItem::new("m2", "Thai Iced Tea", Money::from_cents(30), "Drinks");
            self.cart
                .add_item(CartCandidate::new(tea, 1).restaurant("r1"))
                .unwrap();
            self.inner.place_order(order).await
        }
    }

    fn filled_cart() -> CartState {
        let cart = CartState::new();
        let item = MenuItem::new("m1", "Pad Thai", Money::from_cents(50), "Noodles");
        cart.add_item(CartCandidate::new(item, 2).restaurant("r1"))
            .unwrap();
        cart
    }

    #[tokio::test]
    async fn test_checkout_clears_cart() {
        let checkout = Arc::new(MemoryCheckout::new());
        let flow = CheckoutFlow::new(Arc::clone(&checkout), filled_cart());

        let receipt = flow.checkout().await.unwrap();

        assert_eq!(receipt.order_id, "ord-0001");
        assert_eq!(receipt.total.cents(), 100);
        assert!(flow.cart().snapshot().is_empty());
        assert_eq!(checkout.orders()[0].restaurant_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_failed_checkout_keeps_cart() {
        let checkout = Arc::new(MemoryCheckout::new());
        checkout.set_failing(true);
        let flow = CheckoutFlow::new(Arc::clone(&checkout), filled_cart());

        let err = flow.checkout().await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(flow.cart().totals().count, 2);
        assert!(checkout.orders().is_empty());
    }

    #[tokio::test]
    async fn test_lines_added_during_checkout_are_kept() {
        let cart = filled_cart();
        let checkout = Arc::new(BusyCustomer {
            cart: cart.clone(),
            inner: MemoryCheckout::new(),
        });
        let flow = CheckoutFlow::new(Arc::clone(&checkout), cart);

        let receipt = flow.checkout().await.unwrap();

        assert_eq!(receipt.total.cents(), 100);
        let left = flow.cart().snapshot();
        assert_eq!(left.len(), 1);
        assert_eq!(left.lines()[0].item.id, "m2");
        assert_eq!(left.total_amount().cents(), 30);
        assert_eq!(left.restaurant_id(), Some("r1"));
        assert_eq!(checkout.inner.orders()[0].lines.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_cart_is_refused() {
        let checkout = Arc::new(MemoryCheckout::new());
        let flow = CheckoutFlow::new(Arc::clone(&checkout), CartState::new());

        let err = flow.checkout().await.unwrap_err();

        assert!(matches!(err, SessionError::Core(CoreError::EmptyCart)));
        assert!(checkout.orders().is_empty());
    }
}
