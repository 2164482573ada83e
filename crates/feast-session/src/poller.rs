//! # Work Poller
//!
//! Background task that pulls work while the rider is seeking.
//!
//! ## Poll Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Poller::run                                          │
//! │                                                                         │
//! │   loop {                                                                │
//! │     select! {                                                           │
//! │       interval.tick() ──┐                                               │
//! │       wake.notified() ──┴──► tick(): session.pull_next()                │
//! │                                 Assigned ─► info                        │
//! │                                 Empty / Busy / NotSeeking ─► debug      │
//! │                                 Err ─► warn + emit_error                │
//! │       shutdown_rx.recv() ──► break                                      │
//! │     }                                                                   │
//! │   }                                                                     │
//! │                                                                         │
//! │  • First tick fires immediately (pull on go_online)                    │
//! │  • A tick is awaited inside the loop, so pulls never overlap           │
//! │  • complete_work() wakes the loop for an immediate pull                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tracing::{debug, info, warn};

use crate::config::RiderSettings;
use crate::error::{SessionError, SessionResult};
use crate::rider::{PullOutcome, RiderSession, WeakRiderSession};
use crate::source::WorkSource;

/// Drives `pull_next` on a timer for one rider session.
///
/// The poller only holds a weak reference: once the last session handle is
/// dropped, its channel closes and the loop ends on its own.
pub struct Poller<S: WorkSource> {
    session: WeakRiderSession<S>,
    settings: RiderSettings,
    wake: Arc<Notify>,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Controls a running poller.
#[derive(Clone)]
pub struct PollerHandle {
    shutdown_tx: mpsc::Sender<()>,
    wake: Arc<Notify>,
}

impl PollerHandle {
    /// Requests an immediate pull.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Stops the loop after the current tick.
    pub async fn shutdown(&self) -> SessionResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SessionError::ChannelError("Poller shutdown channel closed".into()))
    }
}

impl<S: WorkSource> Poller<S> {
    /// Creates a poller and returns its handle.
    pub fn new(session: &RiderSession<S>, settings: RiderSettings) -> (Self, PollerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let wake = Arc::new(Notify::new());

        let poller = Poller {
            session: session.downgrade(),
            settings,
            wake: Arc::clone(&wake),
            shutdown_rx,
        };

        (poller, PollerHandle { shutdown_tx, wake })
    }

    /// Runs the poll loop.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!(interval_ms = self.settings.poll_interval_ms, "Work poller starting");

        let mut interval = tokio::time::interval(self.settings.poll_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Work poller shutting down");
                    break;
                }

                _ = interval.tick() => {
                    if !self.tick().await {
                        break;
                    }
                }

                _ = self.wake.notified() => {
                    debug!("Work poller woken");
                    if !self.tick().await {
                        break;
                    }
                    interval.reset();
                }
            }
        }

        info!("Work poller stopped");
    }

    /// One pull attempt. Returns false once the session is gone.
    async fn tick(&self) -> bool {
        let Some(session) = self.session.upgrade() else {
            debug!("Rider session dropped");
            return false;
        };

        match session.pull_next().await {
            Ok(PullOutcome::Assigned(work)) => {
                info!(job_id = %work.id, order_id = %work.order_id, "Poller picked up work");
            }
            Ok(PullOutcome::Empty) => debug!("No work available"),
            Ok(PullOutcome::Busy) => debug!("Pull already in flight"),
            Ok(PullOutcome::NotSeeking) => debug!("Rider not seeking, skipping pull"),
            Err(e) => {
                warn!(error = %e, retryable = e.is_retryable(), "Pull failed");
                session.report_error(&e);
            }
        }

        true
    }
}
