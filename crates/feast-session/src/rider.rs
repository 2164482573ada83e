//! # Rider Work Session
//!
//! Single source of truth for "am I online, and which job do I hold".
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Rider Session Transitions                            │
//! │                                                                         │
//! │              go_online()                  pull_next() → job             │
//! │   OFFLINE ──────────────► SEEKING ───────────────────────► ASSIGNED     │
//! │      ▲                     │   ▲                              │         │
//! │      │    go_offline()     │   │ complete_work() ack          │ start_  │
//! │      └─────────────────────┘   │ (poller woken)               │ work()  │
//! │                                │                              ▼ ack     │
//! │                                └────────────────────────── WORKING      │
//! │                                                                         │
//! │  Every transition:                                                     │
//! │  1. waits for the work source to acknowledge (pull/start/complete)     │
//! │  2. takes the state write lock                                         │
//! │  3. saves the new snapshot to the SessionStore                         │
//! │  4. emits the new snapshot to the UI                                   │
//! │                                                                         │
//! │  A failed acknowledgement returns Err and changes nothing.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tasks
//! - The [`Poller`] runs while the rider is online and calls `pull_next` on
//!   every tick. An atomic in-flight guard keeps a manual `pull_next` from
//!   racing it.
//! - The store watcher mirrors snapshots written by other handles of the
//!   same store (last write wins).
//!
//! Both tasks stop on [`RiderSession::shutdown`] or when the last session
//! handle is dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use feast_core::{Availability, RiderWork, WorkStatus};

use crate::config::{RiderSettings, StorageSettings};
use crate::error::{SessionError, SessionResult};
use crate::poller::{Poller, PollerHandle};
use crate::source::WorkSource;
use crate::store::{MemoryStore, RiderPhase, SessionSnapshot, SessionStore};

// =============================================================================
// Event Emitter
// =============================================================================

/// Receives session updates for the UI layer.
pub trait SessionEvents: Send + Sync {
    /// Emits the snapshot after every committed change.
    fn emit_state(&self, snapshot: &SessionSnapshot);

    /// Emits a failure the user did not directly trigger.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl SessionEvents for NoOpEmitter {
    fn emit_state(&self, _snapshot: &SessionSnapshot) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Pull Outcome
// =============================================================================

/// What a `pull_next` call did.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// A job was assigned and is now the current work.
    Assigned(RiderWork),

    /// The work source had nothing to hand out.
    Empty,

    /// Another pull was already in flight; nothing was requested.
    Busy,

    /// The rider is offline or already holds a job.
    NotSeeking,
}

/// Holds the in-flight flag for the duration of one pull.
struct PullGuard<'a>(&'a AtomicBool);

impl<'a> PullGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PullGuard(flag))
    }
}

impl Drop for PullGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// =============================================================================
// Rider Session
// =============================================================================

struct RunningPoller {
    handle: PollerHandle,
    task: JoinHandle<()>,
}

struct Inner<S: WorkSource> {
    source: Arc<S>,
    store: Arc<dyn SessionStore>,
    emitter: Arc<dyn SessionEvents>,
    settings: RiderSettings,

    state: RwLock<SessionSnapshot>,

    /// Set while a pull request is outstanding.
    pulling: AtomicBool,

    /// Set by `shutdown`; no task is started afterwards.
    closed: AtomicBool,

    poller: Mutex<Option<RunningPoller>>,
    watcher: StdMutex<Option<JoinHandle<()>>>,
}

impl<S: WorkSource> Drop for Inner<S> {
    fn drop(&mut self) {
        let watcher = self.watcher.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = watcher.take() {
            task.abort();
        }
    }
}

/// The rider's work session.
///
/// Cheap to clone; all clones share the same state.
pub struct RiderSession<S: WorkSource> {
    inner: Arc<Inner<S>>,
}

impl<S: WorkSource> Clone for RiderSession<S> {
    fn clone(&self) -> Self {
        RiderSession {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Non-owning session reference held by background tasks.
pub(crate) struct WeakRiderSession<S: WorkSource> {
    inner: Weak<Inner<S>>,
}

impl<S: WorkSource> WeakRiderSession<S> {
    pub(crate) fn upgrade(&self) -> Option<RiderSession<S>> {
        self.inner.upgrade().map(|inner| RiderSession { inner })
    }
}

impl<S: WorkSource> RiderSession<S> {
    /// Starts building a session around a work source.
    pub fn builder(source: Arc<S>) -> RiderSessionBuilder<S> {
        RiderSessionBuilder::new(source)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Current snapshot.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().await.clone()
    }

    /// Current phase.
    pub async fn phase(&self) -> RiderPhase {
        self.inner.state.read().await.phase()
    }

    pub fn source(&self) -> &Arc<S> {
        &self.inner.source
    }

    pub fn settings(&self) -> &RiderSettings {
        &self.inner.settings
    }

    /// Returns true while the poll task is running.
    pub async fn is_polling(&self) -> bool {
        self.inner
            .poller
            .lock()
            .await
            .as_ref()
            .is_some_and(|p| !p.task.is_finished())
    }

    // =========================================================================
    // Availability
    // =========================================================================

    /// Goes online and starts pulling work.
    ///
    /// The availability report is best effort: a failure is logged and
    /// emitted, the local toggle stands.
    pub async fn go_online(&self) -> SessionResult<()> {
        self.ensure_open()?;

        let changed = {
            let mut state = self.inner.state.write().await;
            if state.is_working {
                false
            } else {
                let next = SessionSnapshot {
                    is_working: true,
                    ..state.clone()
                };
                self.commit(&mut state, next);
                true
            }
        };

        if changed {
            info!("Rider online");
            self.announce(Availability::Online).await;
        }

        self.start_poller().await;
        Ok(())
    }

    /// Goes offline and stops pulling.
    ///
    /// A job already assigned or in progress is kept; the rider can still
    /// start and complete it.
    pub async fn go_offline(&self) -> SessionResult<()> {
        self.ensure_open()?;

        let changed = {
            let mut state = self.inner.state.write().await;
            if state.is_working {
                let next = SessionSnapshot {
                    is_working: false,
                    ..state.clone()
                };
                self.commit(&mut state, next);
                true
            } else {
                false
            }
        };

        self.stop_poller().await;

        if changed {
            info!("Rider offline");
            self.announce(Availability::Offline).await;
        }

        Ok(())
    }

    async fn announce(&self, availability: Availability) {
        if let Err(e) = self.inner.source.set_availability(availability).await {
            warn!(%availability, error = %e, "Failed to report availability");
            self.report_error(&e);
        }
    }

    // =========================================================================
    // Work Transitions
    // =========================================================================

    /// Asks the work source for the next job.
    ///
    /// ## Behavior
    /// - Another pull in flight: `Busy`, no request
    /// - Not seeking (offline, or a job is held): `NotSeeking`, no request
    /// - Job returned: stored as `ASSIGNED`, then the queue count is refreshed
    /// - Nothing returned: `Empty`
    ///
    /// The phase is read under the guard. A pull that commits a job releases
    /// the guard only afterwards, so the next caller sees it.
    pub async fn pull_next(&self) -> SessionResult<PullOutcome> {
        let Some(_guard) = PullGuard::acquire(&self.inner.pulling) else {
            return Ok(PullOutcome::Busy);
        };

        if self.phase().await != RiderPhase::Seeking {
            return Ok(PullOutcome::NotSeeking);
        }

        let Some(mut work) = self.inner.source.pull_next().await? else {
            debug!("Work source returned no job");
            return Ok(PullOutcome::Empty);
        };

        work.status = WorkStatus::Assigned;
        work.assigned_at = Some(work.assigned_at.unwrap_or_else(Utc::now));

        {
            let mut state = self.inner.state.write().await;
            if let Some(held) = &state.current_work {
                // Another tab (or reconcile) stored a job while we waited.
                warn!(held = %held.id, pulled = %work.id, "Already holding a job, keeping it");
                return Ok(PullOutcome::NotSeeking);
            }

            let next = SessionSnapshot {
                current_work: Some(work.clone()),
                ..state.clone()
            };
            self.commit(&mut state, next);
        }

        info!(
            job_id = %work.id,
            order_id = %work.order_id,
            fee = %work.estimated_fee,
            "Work assigned"
        );

        if self.inner.settings.refresh_queue_after_pull {
            if let Err(e) = self.refresh_queue_count().await {
                warn!(error = %e, "Failed to refresh queue count after pull");
                self.report_error(&e);
            }
        }

        Ok(PullOutcome::Assigned(work))
    }

    /// Picks up the assigned job.
    ///
    /// Returns `Ok(None)` when no job is waiting to be started.
    pub async fn start_work(&self) -> SessionResult<Option<RiderWork>> {
        let Some(job_id) = self.held_job(WorkStatus::InProgress).await else {
            debug!("No assigned job to start");
            return Ok(None);
        };

        self.inner.source.start(&job_id).await?;

        let mut state = self.inner.state.write().await;
        let Some(mut work) = Self::held(&state, &job_id, WorkStatus::InProgress) else {
            warn!(%job_id, "Job changed while start was in flight");
            return Ok(None);
        };

        work.status = WorkStatus::InProgress;
        work.started_at = Some(Utc::now());

        let next = SessionSnapshot {
            current_work: Some(work.clone()),
            ..state.clone()
        };
        self.commit(&mut state, next);

        info!(job_id = %work.id, "Work started");
        Ok(Some(work))
    }

    /// Delivers the job in progress.
    ///
    /// Returns the settled job for display; the session no longer holds it.
    /// If the rider is still online the poller is woken for an immediate pull.
    pub async fn complete_work(&self) -> SessionResult<Option<RiderWork>> {
        let Some(job_id) = self.held_job(WorkStatus::Completed).await else {
            debug!("No job in progress to complete");
            return Ok(None);
        };

        self.inner.source.complete(&job_id).await?;

        let (settled, still_online) = {
            let mut state = self.inner.state.write().await;
            let Some(mut work) = Self::held(&state, &job_id, WorkStatus::Completed) else {
                warn!(%job_id, "Job changed while complete was in flight");
                return Ok(None);
            };

            work.status = WorkStatus::Completed;
            work.finished_at = Some(Utc::now());

            let next = SessionSnapshot {
                current_work: None,
                ..state.clone()
            };
            let committed = self.commit(&mut state, next);
            (work, committed.is_working)
        };

        info!(
            job_id = %settled.id,
            elapsed_secs = ?settled.elapsed(Utc::now()).map(|d| d.num_seconds()),
            "Work completed"
        );

        if still_online {
            self.wake_poller().await;
        }

        Ok(Some(settled))
    }

    /// Reads the advisory queue count and stores it.
    pub async fn refresh_queue_count(&self) -> SessionResult<u32> {
        let count = self.inner.source.get_queue_count().await?;

        let mut state = self.inner.state.write().await;
        if state.queue_count != count {
            let next = SessionSnapshot {
                queue_count: count,
                ..state.clone()
            };
            self.commit(&mut state, next);
            debug!(queue_count = count, "Queue count refreshed");
        }

        Ok(count)
    }

    /// Adopts the work source's view of the current job.
    ///
    /// Used on startup and resume, when the stored snapshot may be stale.
    pub async fn reconcile(&self) -> SessionResult<SessionSnapshot> {
        let active = self
            .inner
            .source
            .get_active()
            .await?
            .filter(|w| !w.status.is_terminal());

        let mut state = self.inner.state.write().await;
        let unchanged = match (&state.current_work, &active) {
            (Some(held), Some(server)) => held.id == server.id && held.status == server.status,
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(state.clone());
        }

        info!(
            held = ?state.current_work.as_ref().map(|w| &w.id),
            server = ?active.as_ref().map(|w| &w.id),
            "Adopting server's current work"
        );

        let next = SessionSnapshot {
            current_work: active,
            ..state.clone()
        };
        Ok(self.commit(&mut state, next))
    }

    // =========================================================================
    // Store Watching
    // =========================================================================

    /// Mirrors snapshots saved by other handles of the store.
    ///
    /// Returns false if the store has no change notification.
    pub fn watch_store(&self) -> bool {
        let Some(mut watcher) = self.inner.store.watch() else {
            return false;
        };

        let weak = self.downgrade();
        let task = tokio::spawn(async move {
            while let Some(snapshot) = watcher.changed().await {
                let Some(session) = weak.upgrade() else {
                    break;
                };
                session.apply_remote(snapshot).await;
            }
            debug!("Session watcher stopped");
        });

        let mut slot = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }

        true
    }

    async fn apply_remote(&self, snapshot: SessionSnapshot) {
        let is_working = {
            let mut state = self.inner.state.write().await;
            if *state == snapshot {
                return;
            }

            debug!(phase = %snapshot.phase(), "Mirroring session change from another handle");
            *state = snapshot;
            self.inner.emitter.emit_state(&state);
            state.is_working
        };

        if is_working {
            self.start_poller().await;
        } else {
            self.stop_poller().await;
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Stops the poller and the store watcher.
    ///
    /// The stored snapshot is left as is, so a restored session comes back
    /// online if it was online here.
    pub async fn shutdown(&self) {
        info!("Shutting down rider session");
        self.inner.closed.store(true, Ordering::SeqCst);

        let watcher = self
            .inner
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = watcher {
            task.abort();
        }

        self.stop_poller().await;
        info!("Rider session stopped");
    }

    fn ensure_open(&self) -> SessionResult<()> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(SessionError::ShuttingDown);
        }
        Ok(())
    }

    async fn start_poller(&self) {
        let mut slot = self.inner.poller.lock().await;
        if self.inner.closed.load(Ordering::SeqCst) {
            return;
        }
        if slot.as_ref().is_some_and(|p| !p.task.is_finished()) {
            return;
        }

        let (poller, handle) = Poller::new(self, self.inner.settings.clone());
        let task = tokio::spawn(poller.run());
        *slot = Some(RunningPoller { handle, task });
    }

    async fn stop_poller(&self) {
        let running = self.inner.poller.lock().await.take();
        if let Some(RunningPoller { handle, task }) = running {
            if let Err(e) = handle.shutdown().await {
                debug!(error = %e, "Poller already gone");
            }
            if let Err(e) = task.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
        }
    }

    async fn wake_poller(&self) {
        if let Some(running) = self.inner.poller.lock().await.as_ref() {
            running.handle.wake();
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    pub(crate) fn downgrade(&self) -> WeakRiderSession<S> {
        WeakRiderSession {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn report_error(&self, err: &SessionError) {
        self.inner
            .emitter
            .emit_error(&err.to_string(), err.is_retryable());
    }

    /// Id of the held job, if it may move to `next`.
    async fn held_job(&self, next: WorkStatus) -> Option<String> {
        self.inner
            .state
            .read()
            .await
            .current_work
            .as_ref()
            .filter(|w| w.status.can_transition_to(next))
            .map(|w| w.id.clone())
    }

    fn held(state: &SessionSnapshot, job_id: &str, next: WorkStatus) -> Option<RiderWork> {
        state
            .current_work
            .as_ref()
            .filter(|w| w.id == job_id && w.status.can_transition_to(next))
            .cloned()
    }

    /// Persists and publishes `next`. Must be called with the write lock held
    /// so saves land in transition order.
    fn commit(&self, state: &mut SessionSnapshot, next: SessionSnapshot) -> SessionSnapshot {
        if let Err(e) = self.inner.store.save(&next) {
            error!(error = %e, "Failed to persist rider session");
            self.inner.emitter.emit_error(&e.to_string(), false);
        }

        *state = next;
        self.inner.emitter.emit_state(state);
        state.clone()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`RiderSession`].
///
/// ## Usage
/// ```rust,ignore
/// let session = RiderSession::builder(Arc::new(api))
///     .store(Arc::new(JsonFileStore::from_config(&config)?))
///     .settings(config.rider.clone())
///     .restore()
///     .await;
/// ```
pub struct RiderSessionBuilder<S: WorkSource> {
    source: Arc<S>,
    store: Option<Arc<dyn SessionStore>>,
    emitter: Arc<dyn SessionEvents>,
    settings: RiderSettings,
}

impl<S: WorkSource> RiderSessionBuilder<S> {
    fn new(source: Arc<S>) -> Self {
        RiderSessionBuilder {
            source,
            store: None,
            emitter: Arc::new(NoOpEmitter),
            settings: RiderSettings::default(),
        }
    }

    /// Sets the snapshot store. Defaults to a private `MemoryStore`.
    pub fn store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn emitter(mut self, emitter: Arc<dyn SessionEvents>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn settings(mut self, settings: RiderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the session from the stored snapshot without starting tasks.
    pub fn build(self) -> RiderSession<S> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new(StorageSettings::default().session_key)));

        let mut snapshot = match store.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => SessionSnapshot::default(),
            Err(e) => {
                warn!(error = %e, "Stored rider session unreadable, starting fresh");
                SessionSnapshot::default()
            }
        };

        if snapshot.current_work.as_ref().is_some_and(|w| w.status.is_terminal()) {
            snapshot.current_work = None;
        }

        debug!(phase = %snapshot.phase(), "Rider session loaded");

        RiderSession {
            inner: Arc::new(Inner {
                source: self.source,
                store,
                emitter: self.emitter,
                settings: self.settings,
                state: RwLock::new(snapshot),
                pulling: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                poller: Mutex::new(None),
                watcher: StdMutex::new(None),
            }),
        }
    }

    /// Builds the session, starts watching the store and resumes polling
    /// when the stored snapshot is online.
    pub async fn restore(self) -> RiderSession<S> {
        let session = self.build();
        session.watch_store();

        if session.snapshot().await.is_working {
            info!("Restored online rider session, resuming polling");
            session.start_poller().await;
        }

        session
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
