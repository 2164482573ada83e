//! # Feast Demo Entry Point
//!
//! Runs a customer cart and a rider shift against in-memory collaborators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  main.rs ────► logging, config                                         │
//! │                                                                         │
//! │  customer ───► CartState + MemoryCatalog ──► CheckoutFlow              │
//! │                add, merge, cross-restaurant conflict, checkout          │
//! │                                                                         │
//! │  rider ──────► RiderSession + MemoryWorkSource + MemoryStore           │
//! │                online → assigned → working → completed → offline        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `RUST_LOG=feast=trace cargo run -p feast-demo` shows every transition.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use feast_core::{MenuItem, Money, RiderWork};
use feast_session::mock::{MemoryCatalog, MemoryCheckout, MemoryWorkSource};
use feast_session::{
    CartState, CheckoutFlow, FeastConfig, MemoryStore, RiderPhase, RiderSession, SessionResult,
};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = FeastConfig::load_or_default(None);
    info!(
        poll_interval_ms = config.rider.poll_interval_ms,
        session_key = %config.storage.session_key,
        "Feast demo starting"
    );

    if let Err(e) = run_customer(&config).await {
        error!(error = %e, "Customer flow failed");
    }

    if let Err(e) = run_rider(&config).await {
        error!(error = %e, "Rider flow failed");
    }

    info!("Feast demo finished");
}

const DEFAULT_FILTER: &str = "info,feast=debug";

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise `info,feast=debug`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    build_subscriber(filter).init();
}

fn build_subscriber(filter: EnvFilter) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt().with_env_filter(filter).finish()
}

async fn run_customer(config: &FeastConfig) -> SessionResult<()> {
    let catalog = MemoryCatalog::new()
        .with_menu(
            "r1",
            vec![
                MenuItem::new("m1", "Pad Thai", Money::from_cents(5000), "Noodles"),
                MenuItem::new("m2", "Thai Iced Tea", Money::from_cents(2500), "Drinks"),
            ],
        )
        .with_menu(
            "r2",
            vec![MenuItem::new("b1", "Cheeseburger", Money::from_cents(8900), "Mains")],
        );

    let cart = CartState::with_limits(config.cart.limits());

    cart.add_from_catalog(&catalog, "r1", "m1", 2, None).await?;
    cart.add_from_catalog(&catalog, "r1", "m1", 1, Some("extra spicy".into()))
        .await?;
    cart.add_from_catalog(&catalog, "r1", "m2", 1, None).await?;

    match cart.add_from_catalog(&catalog, "r2", "b1", 1, None).await {
        Err(e) if e.is_cart_conflict() => {
            info!(error = %e, "Kept the cart to one restaurant");
        }
        other => {
            other?;
        }
    }

    let totals = cart.totals();
    info!(
        lines = totals.line_count,
        count = totals.count,
        total = %totals.total_amount,
        "Cart ready"
    );

    let flow = CheckoutFlow::new(Arc::new(MemoryCheckout::new()), cart);
    let receipt = flow.checkout().await?;
    info!(order_id = %receipt.order_id, total = %receipt.total, "Checkout done");

    Ok(())
}

async fn run_rider(config: &FeastConfig) -> SessionResult<()> {
    let source = Arc::new(MemoryWorkSource::with_jobs([
        RiderWork::queued("job-1", "ord-0001", Money::from_cents(4500))
            .pickup("Baan Thai", "12 Sukhumvit Rd")
            .dropoff("Mali", "88 Silom Rd"),
        RiderWork::queued("job-2", "ord-0002", Money::from_cents(3800))
            .pickup("Burger Bar", "5 Rama IV Rd")
            .dropoff("Somchai", "21 Sathorn Rd"),
    ]));

    let session = RiderSession::builder(Arc::clone(&source))
        .store(Arc::new(MemoryStore::new(config.storage.session_key.clone())))
        .settings(config.rider.clone())
        .restore()
        .await;

    session.refresh_queue_count().await?;
    session.go_online().await?;

    for _ in 0..2 {
        wait_for_phase(&session, RiderPhase::Assigned, config.rider.poll_interval() * 3).await;

        if let Some(work) = session.start_work().await? {
            info!(job_id = %work.id, to = %work.delivery_address, "Picked up");
        }
        if let Some(work) = session.complete_work().await? {
            info!(job_id = %work.id, fee = %work.estimated_fee, "Delivered");
        }
    }

    session.go_offline().await?;
    let snapshot = session.snapshot().await;
    info!(phase = %snapshot.phase(), queue = snapshot.queue_count, "Shift over");

    session.shutdown().await;
    Ok(())
}

async fn wait_for_phase(
    session: &RiderSession<MemoryWorkSource>,
    phase: RiderPhase,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    while session.phase().await != phase && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::level_filters::LevelFilter;
    use tracing::Subscriber;

    #[test]
    fn test_filter_sets_max_level() {
        let subscriber = build_subscriber(EnvFilter::new(DEFAULT_FILTER));
        assert_eq!(subscriber.max_level_hint(), Some(LevelFilter::DEBUG));

        let quiet = build_subscriber(EnvFilter::new("warn"));
        assert_eq!(quiet.max_level_hint(), Some(LevelFilter::WARN));
    }
}
