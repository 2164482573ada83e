//! # feast-session: Async Client State for Feast
//!
//! This crate holds everything in the Feast client core that awaits: the
//! rider work session with its poll loop and persisted snapshot, and the
//! shared cart handle with its checkout flow.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Client State Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 RiderSession (rider work screen)                 │  │
//! │  │                                                                  │  │
//! │  │  go_online / go_offline / pull_next / start_work / complete_work │  │
//! │  │  state: RwLock<SessionSnapshot>, saved on every transition       │  │
//! │  └───────┬──────────────────────┬────────────────────────┬─────────┘  │
//! │          ▼                      ▼                        ▼             │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐   │
//! │  │ Poller         │  │ SessionStore       │  │ WorkSource         │   │
//! │  │                │  │                    │  │                    │   │
//! │  │ Tokio task     │  │ MemoryStore (tabs) │  │ rider job API      │   │
//! │  │ tick / wake /  │  │ JsonFileStore      │  │ (HTTP in the app,  │   │
//! │  │ shutdown       │  │ watch → mirror     │  │  mock in tests)    │   │
//! │  └────────────────┘  └────────────────────┘  └────────────────────┘   │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────────┐  ┌────────────────────┐   │
//! │  │ CartState      │─►│ Catalog            │  │ CheckoutFlow       │   │
//! │  │ Arc<Mutex<Cart>│  │ menu(restaurant)   │  │ → Checkout         │   │
//! │  └────────────────┘  └────────────────────┘  └────────────────────┘   │
//! │                                                                         │
//! │  EVENTS (to the page via SessionEvents):                               │
//! │  • emit_state - snapshot after each committed change                   │
//! │  • emit_error - failures from background work                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`rider`] - `RiderSession`, its builder and the event emitter trait
//! - [`poller`] - Background pull loop
//! - [`store`] - Session snapshot and the stores that keep it
//! - [`source`] - Collaborator traits (`WorkSource`, `Catalog`, `Checkout`)
//! - [`cart_state`] - Shared cart handle
//! - [`checkout`] - Cart to order
//! - [`config`] - Client configuration (TOML + environment)
//! - [`mock`] - In-memory collaborators
//! - [`error`] - Session error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use feast_session::{FeastConfig, JsonFileStore, RiderSession};
//!
//! let config = FeastConfig::load_or_default(None);
//! let session = RiderSession::builder(Arc::new(api))
//!     .store(Arc::new(JsonFileStore::from_config(&config)?))
//!     .settings(config.rider.clone())
//!     .restore()
//!     .await;
//!
//! session.go_online().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart_state;
pub mod checkout;
pub mod config;
pub mod error;
pub mod mock;
pub mod poller;
pub mod rider;
pub mod source;
pub mod store;

// =============================================================================
// Re-exports
// =============================================================================

pub use cart_state::CartState;
pub use checkout::CheckoutFlow;
pub use config::{CartSettings, FeastConfig, RiderSettings, StorageSettings};
pub use error::{SessionError, SessionResult};
pub use poller::{Poller, PollerHandle};
pub use rider::{NoOpEmitter, PullOutcome, RiderSession, RiderSessionBuilder, SessionEvents};
pub use source::{Catalog, Checkout, OrderLine, OrderReceipt, OrderRequest, WorkSource};
pub use store::{JsonFileStore, MemoryStore, RiderPhase, SessionSnapshot, SessionStore, StoreWatcher};
