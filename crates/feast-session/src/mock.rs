//! # In-Memory Collaborators
//!
//! Server stand-ins for tests and the demo binary. Each one keeps the state
//! a real backend would, and can be told to fail a given operation so error
//! paths can be exercised.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use feast_core::{Availability, MenuItem, RiderWork, WorkStatus};

use crate::error::{SessionError, SessionResult};
use crate::source::{Catalog, Checkout, OrderReceipt, OrderRequest, WorkSource};

// =============================================================================
// Work Source
// =============================================================================

/// Operations of [`WorkSource`], for failure injection and call counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkOp {
    GetActive,
    PullNext,
    SetAvailability,
    Start,
    Complete,
    QueueCount,
}

#[derive(Default)]
struct WorkSourceState {
    queue: VecDeque<RiderWork>,
    active: Option<RiderWork>,
    completed: Vec<RiderWork>,
    availability: Option<Availability>,
    failing: HashSet<WorkOp>,
    calls: HashMap<WorkOp, u32>,
}

/// A job server holding a FIFO queue and the rider's active job.
#[derive(Default)]
pub struct MemoryWorkSource {
    state: Mutex<WorkSourceState>,
    pull_delay: Option<Duration>,
}

impl MemoryWorkSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a source with the given jobs queued in order.
    pub fn with_jobs(jobs: impl IntoIterator<Item = RiderWork>) -> Self {
        let source = Self::default();
        source.lock().queue.extend(jobs);
        source
    }

    /// Makes every `pull_next` take this long before answering.
    pub fn with_pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = Some(delay);
        self
    }

    /// Queues another job.
    pub fn push_job(&self, work: RiderWork) {
        self.lock().queue.push_back(work);
    }

    /// Assigns a job without going through `pull_next`, as another device
    /// of the same rider would.
    pub fn assign_directly(&self, mut work: RiderWork) {
        work.status = WorkStatus::Assigned;
        work.assigned_at = Some(Utc::now());
        self.lock().active = Some(work);
    }

    /// Makes `op` fail with a transport error until [`recover`](Self::recover).
    pub fn fail(&self, op: WorkOp) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: WorkOp) {
        self.lock().failing.remove(&op);
    }

    /// Number of times `op` was called, failed calls included.
    pub fn calls(&self, op: WorkOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn queued(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn active(&self) -> Option<RiderWork> {
        self.lock().active.clone()
    }

    pub fn completed(&self) -> Vec<RiderWork> {
        self.lock().completed.clone()
    }

    pub fn availability(&self) -> Option<Availability> {
        self.lock().availability
    }

    fn lock(&self) -> MutexGuard<'_, WorkSourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts the call and applies injected failures.
    fn enter(&self, op: WorkOp) -> SessionResult<MutexGuard<'_, WorkSourceState>> {
        let mut state = self.lock();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failing.contains(&op) {
            return Err(SessionError::Transport(format!("{:?} unavailable", op)));
        }
        Ok(state)
    }
}

fn rejected(operation: &str, reason: impl Into<String>) -> SessionError {
    SessionError::Rejected {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

#[async_trait]
impl WorkSource for MemoryWorkSource {
    async fn get_active(&self) -> SessionResult<Option<RiderWork>> {
        let state = self.enter(WorkOp::GetActive)?;
        Ok(state.active.clone())
    }

    async fn pull_next(&self) -> SessionResult<Option<RiderWork>> {
        drop(self.enter(WorkOp::PullNext)?);

        if let Some(delay) = self.pull_delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.active.is_some() {
            return Err(rejected("pull", "rider already holds a job"));
        }

        let Some(mut work) = state.queue.pop_front() else {
            return Ok(None);
        };
        work.status = WorkStatus::Assigned;
        work.assigned_at = Some(Utc::now());
        state.active = Some(work.clone());

        Ok(Some(work))
    }

    async fn set_availability(&self, availability: Availability) -> SessionResult<()> {
        let mut state = self.enter(WorkOp::SetAvailability)?;
        state.availability = Some(availability);
        Ok(())
    }

    async fn start(&self, job_id: &str) -> SessionResult<()> {
        let mut state = self.enter(WorkOp::Start)?;
        match state.active.as_mut() {
            Some(work) if work.id == job_id && work.status == WorkStatus::Assigned => {
                work.status = WorkStatus::InProgress;
                work.started_at = Some(Utc::now());
                Ok(())
            }
            Some(work) if work.id == job_id => {
                Err(rejected("start", format!("job is {}", work.status)))
            }
            _ => Err(SessionError::NotFound(format!("job {}", job_id))),
        }
    }

    async fn complete(&self, job_id: &str) -> SessionResult<()> {
        let mut state = self.enter(WorkOp::Complete)?;
        match state.active.take() {
            Some(mut work) if work.id == job_id && work.status == WorkStatus::InProgress => {
                work.status = WorkStatus::Completed;
                work.finished_at = Some(Utc::now());
                state.completed.push(work);
                Ok(())
            }
            other => {
                let err = match &other {
                    Some(work) if work.id == job_id => {
                        rejected("complete", format!("job is {}", work.status))
                    }
                    _ => SessionError::NotFound(format!("job {}", job_id)),
                };
                state.active = other;
                Err(err)
            }
        }
    }

    async fn get_queue_count(&self) -> SessionResult<u32> {
        let state = self.enter(WorkOp::QueueCount)?;
        Ok(state.queue.len() as u32)
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Fixed menus keyed by restaurant id.
#[derive(Default)]
pub struct MemoryCatalog {
    menus: HashMap<String, Vec<MenuItem>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_menu(mut self, restaurant_id: impl Into<String>, items: Vec<MenuItem>) -> Self {
        self.menus.insert(restaurant_id.into(), items);
        self
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn menu(&self, restaurant_id: &str) -> SessionResult<Vec<MenuItem>> {
        self.menus
            .get(restaurant_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(format!("restaurant {}", restaurant_id)))
    }
}

// =============================================================================
// Checkout
// =============================================================================

/// Records placed orders and hands out sequential order ids.
#[derive(Default)]
pub struct MemoryCheckout {
    orders: Mutex<Vec<OrderRequest>>,
    next_id: AtomicU64,
    failing: AtomicBool,
}

impl MemoryCheckout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `place_order` fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Orders accepted so far.
    pub fn orders(&self) -> Vec<OrderRequest> {
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Checkout for MemoryCheckout {
    async fn place_order(&self, order: &OrderRequest) -> SessionResult<OrderReceipt> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::Timeout(10_000));
        }

        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.orders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(order.clone());

        Ok(OrderReceipt {
            order_id: format!("ord-{:04}", seq),
            total: order.total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feast_core::Money;

    fn job(id: &str) -> RiderWork {
        RiderWork::queued(id, format!("order-{}", id), Money::from_cents(300))
    }

    #[tokio::test]
    async fn test_work_source_lifecycle() {
        let source = MemoryWorkSource::with_jobs([job("w1"), job("w2")]);
        assert_eq!(source.get_queue_count().await.unwrap(), 2);

        let pulled = source.pull_next().await.unwrap().unwrap();
        assert_eq!(pulled.id, "w1");
        assert_eq!(pulled.status, WorkStatus::Assigned);
        assert!(source.pull_next().await.is_err());

        assert!(source.complete("w1").await.is_err());
        source.start("w1").await.unwrap();
        source.complete("w1").await.unwrap();

        assert!(source.active().is_none());
        assert_eq!(source.completed().len(), 1);
        assert_eq!(source.queued(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let source = MemoryWorkSource::new();
        source.fail(WorkOp::QueueCount);

        let err = source.get_queue_count().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(source.calls(WorkOp::QueueCount), 1);

        source.recover(WorkOp::QueueCount);
        assert_eq!(source.get_queue_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catalog_unknown_restaurant() {
        let catalog = MemoryCatalog::new().with_menu("r1", vec![]);
        assert!(catalog.menu("r1").await.unwrap().is_empty());
        assert!(matches!(
            catalog.menu("r2").await,
            Err(SessionError::NotFound(_))
        ));
    }
}
