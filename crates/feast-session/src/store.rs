//! # Session Store
//!
//! Durable home of the rider session snapshot.
//!
//! ## Persistence Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Persistence                                  │
//! │                                                                         │
//! │  RiderSession (tab A)                      RiderSession (tab B)         │
//! │        │                                          ▲                     │
//! │        │ save(snapshot)                           │ apply last write    │
//! │        ▼                                          │                     │
//! │  ┌──────────────────────────────┐        ┌────────┴─────────┐           │
//! │  │ key: "feast.rider.session"   │───────►│ StoreWatcher     │           │
//! │  │ {"isWorking":true,           │ change │ (skips changes   │           │
//! │  │  "currentWork":{...},        │        │  from its own    │           │
//! │  │  "queueCount":3}             │        │  handle)         │           │
//! │  └──────────────────────────────┘        └──────────────────┘           │
//! │                                                                         │
//! │  MemoryStore:   shared map + broadcast channel, one handle per tab      │
//! │  JsonFileStore: <data dir>/<key>.json, written atomically, no watch     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Stores are synchronous: a snapshot is a few hundred bytes and the save
//! must happen while the session holds its state lock, so writes land in
//! the same order as the transitions that produced them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use feast_core::{RiderWork, WorkStatus};

use crate::config::{validate_session_key, FeastConfig};
use crate::error::{SessionError, SessionResult};

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the rider page needs to render, as stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub is_working: bool,

    #[serde(default)]
    pub current_work: Option<RiderWork>,

    #[serde(default)]
    pub queue_count: u32,
}

impl SessionSnapshot {
    /// Derives the rider's phase from the stored fields.
    pub fn phase(&self) -> RiderPhase {
        match self.current_work.as_ref().map(|w| w.status) {
            Some(WorkStatus::InProgress) => RiderPhase::Working,
            Some(WorkStatus::Queued | WorkStatus::Assigned) => RiderPhase::Assigned,
            // A settled job never stays in the snapshot; treat it as absent.
            Some(WorkStatus::Completed | WorkStatus::Cancelled) | None => {
                if self.is_working {
                    RiderPhase::Seeking
                } else {
                    RiderPhase::Offline
                }
            }
        }
    }
}

/// Where the rider is in the work cycle.
///
/// ```text
///            go_online                 pull → job          start
///  OFFLINE ────────────► SEEKING ─────────────► ASSIGNED ────────► WORKING
///     ▲                   │  ▲                                       │
///     └──── go_offline ───┘  └────────────── complete ───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiderPhase {
    Offline,
    Seeking,
    Assigned,
    Working,
}

impl std::fmt::Display for RiderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiderPhase::Offline => "OFFLINE",
            RiderPhase::Seeking => "SEEKING",
            RiderPhase::Assigned => "ASSIGNED",
            RiderPhase::Working => "WORKING",
        };
        write!(f, "{}", s)
    }
}

// =============================================================================
// Store Trait
// =============================================================================

/// Load/save hooks for the rider session, injected at construction.
pub trait SessionStore: Send + Sync {
    /// Reads the stored snapshot; `None` when nothing was saved yet.
    fn load(&self) -> SessionResult<Option<SessionSnapshot>>;

    /// Replaces the stored snapshot.
    fn save(&self, snapshot: &SessionSnapshot) -> SessionResult<()>;

    /// Subscribes to writes made through other handles of the same store.
    ///
    /// Stores without change notification return `None`.
    fn watch(&self) -> Option<StoreWatcher> {
        None
    }
}

// =============================================================================
// Change Notification
// =============================================================================

#[derive(Debug, Clone)]
struct StoreChange {
    key: String,
    origin: u64,
    value: String,
}

/// Receives snapshots written by other handles.
pub struct StoreWatcher {
    rx: broadcast::Receiver<StoreChange>,
    key: String,
    origin: u64,
}

impl StoreWatcher {
    /// Waits for the next foreign write to this watcher's key.
    ///
    /// Returns `None` once every handle of the store is gone.
    pub async fn changed(&mut self) -> Option<SessionSnapshot> {
        loop {
            match self.rx.recv().await {
                Ok(change) => {
                    if change.origin == self.origin || change.key != self.key {
                        continue;
                    }
                    match serde_json::from_str(&change.value) {
                        Ok(snapshot) => return Some(snapshot),
                        Err(e) => {
                            warn!(key = %change.key, error = %e, "Ignoring unreadable session change");
                        }
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // The next message still carries the latest write.
                    debug!(skipped, "Session watcher lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// =============================================================================
// Memory Store
// =============================================================================

const CHANGE_CHANNEL_CAPACITY: usize = 32;

struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
    changes: broadcast::Sender<StoreChange>,
    next_origin: AtomicU64,
}

/// In-process store shared by several handles ("tabs").
///
/// Values are kept in their serialized JSON form, so a snapshot goes through
/// the same format it would in a browser's storage.
pub struct MemoryStore {
    backend: Arc<MemoryBackend>,
    key: String,
    origin: u64,
}

impl MemoryStore {
    /// Creates a fresh backend and its first handle.
    pub fn new(key: impl Into<String>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let backend = Arc::new(MemoryBackend {
            entries: Mutex::new(HashMap::new()),
            changes,
            next_origin: AtomicU64::new(1),
        });

        MemoryStore {
            backend,
            key: key.into(),
            origin: 0,
        }
    }

    /// Opens another handle on the same backend and key.
    pub fn new_tab(&self) -> Self {
        MemoryStore {
            backend: Arc::clone(&self.backend),
            key: self.key.clone(),
            origin: self.backend.next_origin.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Raw stored JSON, for inspection.
    pub fn raw(&self) -> Option<String> {
        self.entries().get(&self.key).cloned()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.backend
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> SessionResult<Option<SessionSnapshot>> {
        match self.raw() {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, snapshot: &SessionSnapshot) -> SessionResult<()> {
        let value = serde_json::to_string(snapshot)?;
        self.entries().insert(self.key.clone(), value.clone());

        // No receivers is fine: nobody else is watching.
        let _ = self.backend.changes.send(StoreChange {
            key: self.key.clone(),
            origin: self.origin,
            value,
        });

        Ok(())
    }

    fn watch(&self) -> Option<StoreWatcher> {
        Some(StoreWatcher {
            rx: self.backend.changes.subscribe(),
            key: self.key.clone(),
            origin: self.origin,
        })
    }
}

// =============================================================================
// JSON File Store
// =============================================================================

/// One JSON file per storage key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Stores the snapshot at `<dir>/<key>.json`.
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        JsonFileStore {
            path: dir.as_ref().join(format!("{}.json", key)),
        }
    }

    /// Builds a store from the configured data dir and key.
    ///
    /// Keys that would leave the data dir are refused.
    pub fn from_config(config: &FeastConfig) -> SessionResult<Self> {
        validate_session_key(&config.storage.session_key)?;
        let dir = config
            .data_dir()
            .ok_or_else(|| SessionError::StorageFailed("No data directory available".into()))?;
        Ok(Self::new(dir, &config.storage.session_key))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for JsonFileStore {
    fn load(&self) -> SessionResult<Option<SessionSnapshot>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&self, snapshot: &SessionSnapshot) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write then rename so a crash never leaves half a snapshot behind.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}
