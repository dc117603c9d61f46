//! Best-effort durable storage for demand signals.
//!
//! The matching path never waits on storage. Changes are published as snapshots
//! into a bounded queue with `try_send`; a [PersistenceWorker] running on the host's
//! tokio runtime drains the queue, keeps the highest-revision snapshot and saves it.
//! Publishers may enqueue out of order, so the revision, not arrival, decides.
//! Load and save failures are logged and swallowed here, at the component boundary.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::demand::{DemandField, DemandSignal, DemandSnapshot};
use crate::error::PersistenceError;

pub const PERSISTED_FORMAT_VERSION: u32 = 1;
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Durable store for demand signal state.
#[async_trait]
pub trait PersistenceChannel: Send + Sync {
    /// Load the last saved signals. An empty store yields an empty list.
    async fn load(&self) -> Result<Vec<DemandSignal>, PersistenceError>;

    async fn save(&self, signals: &[DemandSignal]) -> Result<(), PersistenceError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedDemand {
    version: u32,
    signals: Vec<DemandSignal>,
}

/// JSON file store. Saves go to a temp file and are renamed into place.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "demand".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl PersistenceChannel for JsonFileStore {
    async fn load(&self) -> Result<Vec<DemandSignal>, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let persisted: PersistedDemand = serde_json::from_str(&raw)?;
        if persisted.version != PERSISTED_FORMAT_VERSION {
            return Err(PersistenceError::Backend(format!(
                "unsupported demand file version {}",
                persisted.version
            )));
        }
        Ok(persisted.signals)
    }

    async fn save(&self, signals: &[DemandSignal]) -> Result<(), PersistenceError> {
        let body = serde_json::to_vec_pretty(&PersistedDemand {
            version: PERSISTED_FORMAT_VERSION,
            signals: signals.to_vec(),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp = self.temp_path();
        tokio::fs::write(&temp, body).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

/// In-process store, useful as a stand-in for an external backend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    signals: Mutex<Vec<DemandSignal>>,
    saves: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signals(signals: Vec<DemandSignal>) -> Self {
        Self {
            signals: Mutex::new(signals),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn saved(&self) -> Vec<DemandSignal> {
        self.signals.lock().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceChannel for MemoryStore {
    async fn load(&self) -> Result<Vec<DemandSignal>, PersistenceError> {
        Ok(self.signals.lock().clone())
    }

    async fn save(&self, signals: &[DemandSignal]) -> Result<(), PersistenceError> {
        *self.signals.lock() = signals.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Non-blocking publisher handed to the matching path.
#[derive(Debug, Clone)]
pub struct PersistenceSync {
    tx: mpsc::Sender<DemandSnapshot>,
}

impl PersistenceSync {
    /// Queue a snapshot for saving. Never blocks; drops the snapshot when the queue
    /// is full or the worker is gone.
    pub fn publish(&self, snapshot: DemandSnapshot) {
        match self.tx.try_send(snapshot) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("persistence queue full, dropping demand snapshot");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("persistence worker stopped, dropping demand snapshot");
            }
        }
    }
}

/// Receiving half that saves queued snapshots.
#[derive(Debug)]
pub struct PersistenceWorker {
    rx: mpsc::Receiver<DemandSnapshot>,
}

impl PersistenceWorker {
    /// Save snapshots until every [PersistenceSync] is dropped. Queued snapshots are
    /// coalesced to the highest revision, and anything not newer than the last saved
    /// revision is skipped. Returns the number of successful saves.
    pub async fn run(mut self, store: Arc<dyn PersistenceChannel>) -> usize {
        let mut saved = 0;
        let mut saved_revision: Option<u64> = None;
        while let Some(mut latest) = self.rx.recv().await {
            while let Ok(next) = self.rx.try_recv() {
                if next.revision >= latest.revision {
                    latest = next;
                }
            }
            if saved_revision.is_some_and(|revision| latest.revision <= revision) {
                tracing::debug!(revision = latest.revision, "stale demand snapshot skipped");
                continue;
            }
            match store.save(&latest.signals).await {
                Ok(()) => {
                    saved += 1;
                    saved_revision = Some(latest.revision);
                    tracing::debug!(
                        revision = latest.revision,
                        zones = latest.signals.len(),
                        "demand snapshot saved"
                    );
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to save demand snapshot");
                }
            }
        }
        saved
    }
}

#[cfg(test)]
impl PersistenceWorker {
    /// Queued snapshots, in arrival order, without saving them.
    pub(crate) fn drain_queued(&mut self) -> Vec<DemandSnapshot> {
        let mut queued = Vec::new();
        while let Ok(snapshot) = self.rx.try_recv() {
            queued.push(snapshot);
        }
        queued
    }
}

/// Create a publisher/worker pair over a bounded queue.
pub fn persistence_channel(capacity: usize) -> (PersistenceSync, PersistenceWorker) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (PersistenceSync { tx }, PersistenceWorker { rx })
}

/// Load persisted signals into `field`. On failure the field keeps its in-memory
/// defaults. Returns the number of zones restored.
pub async fn restore_demand(store: &dyn PersistenceChannel, field: &DemandField) -> usize {
    match store.load().await {
        Ok(signals) if signals.is_empty() => {
            tracing::info!("no persisted demand state, using defaults");
            0
        }
        Ok(signals) => field.restore(&signals),
        Err(err) => {
            tracing::warn!(error = %err, "failed to load demand state, using defaults");
            0
        }
    }
}
