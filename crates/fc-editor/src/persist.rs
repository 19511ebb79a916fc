//! Snapshot persistence.
//!
//! The canvas state is written as a versioned [`Snapshot`] to a pluggable
//! key-value [`SnapshotStorage`]. Writes are debounced: bursts of store
//! changes collapse into one write once the canvas has been quiet for the
//! debounce delay. A failed write is logged and dropped; it never reaches
//! the interaction loop.
//!
//! Time is passed in as milliseconds so the same code runs under a test
//! clock and in the browser.

use fc_core::{CanvasConfig, Edge, Node, StoreEvent, Viewport};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

/// Current snapshot layout. Readers reject anything else.
pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

pub const DEFAULT_STORAGE_KEY: &str = "flowcanvas.snapshot";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("no snapshot stored under `{0}`")]
    Missing(String),
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("snapshot schema version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("snapshot storage failed: {0}")]
    Storage(String),
}

impl From<std::io::Error> for SnapshotError {
    fn from(e: std::io::Error) -> Self {
        SnapshotError::Storage(e.to_string())
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub schema_version: u32,
    /// Milliseconds, caller clock.
    pub timestamp: u64,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub viewport: Viewport,
    /// Includes the overlay elements.
    pub configuration: CanvasConfig,
}

/// Just enough of a snapshot to check its version before decoding the rest.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotHeader {
    schema_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotFormat {
    #[default]
    Json,
    /// Compact binary encoding for native storage.
    MessagePack,
}

impl Snapshot {
    pub fn new(
        timestamp: u64,
        nodes: Vec<Node>,
        edges: Vec<Edge>,
        viewport: Viewport,
        configuration: CanvasConfig,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            timestamp,
            nodes,
            edges,
            viewport,
            configuration,
        }
    }

    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>, SnapshotError> {
        match format {
            SnapshotFormat::Json => serde_json::to_vec(self)
                .map_err(|e| SnapshotError::Storage(format!("encoding JSON: {e}"))),
            SnapshotFormat::MessagePack => rmp_serde::to_vec_named(self)
                .map_err(|e| SnapshotError::Storage(format!("encoding MessagePack: {e}"))),
        }
    }

    /// Decode and check the schema version. The version is read first, so a
    /// snapshot from a newer writer reports `VersionMismatch` rather than
    /// failing on fields it does not know.
    pub fn decode(bytes: &[u8], format: SnapshotFormat) -> Result<Self, SnapshotError> {
        let header: SnapshotHeader = decode_as(bytes, format)?;
        if header.schema_version != SCHEMA_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: header.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        decode_as(bytes, format)
    }
}

fn decode_as<T: serde::de::DeserializeOwned>(
    bytes: &[u8],
    format: SnapshotFormat,
) -> Result<T, SnapshotError> {
    match format {
        SnapshotFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| SnapshotError::Corrupt(e.to_string()))
        }
        SnapshotFormat::MessagePack => {
            rmp_serde::from_slice(bytes).map_err(|e| SnapshotError::Corrupt(e.to_string()))
        }
    }
}

// ─── Storage ─────────────────────────────────────────────────────────────

/// Key-value storage for encoded snapshots.
///
/// Treated as best-effort; `get` returns `Ok(None)` when nothing was stored.
pub trait SnapshotStorage {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError>;

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError>;
}

/// In-process storage for tests and ephemeral canvases.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStorage for MemoryStorage {
    fn name(&self) -> &str {
        "MemoryStorage"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        let mut guard = self
            .data
            .write()
            .map_err(|_| SnapshotError::Storage("lock poisoned".into()))?;
        guard.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        let guard = self
            .data
            .read()
            .map_err(|_| SnapshotError::Storage("lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }
}

/// One file per key under a directory. Writes go to a temporary file that
/// is renamed over the target, so a crash mid-write leaves the previous
/// snapshot intact.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.snapshot"))
    }
}

impl SnapshotStorage for FileStorage {
    fn name(&self) -> &str {
        "FileStorage"
    }

    fn put(&self, key: &str, bytes: &[u8]) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("snapshot.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        log::debug!("wrote {} byte(s) to {}", bytes.len(), path.display());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, SnapshotError> {
        let path = self.path_for(key);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ─── Debounce ────────────────────────────────────────────────────────────

/// A single pending deadline. Scheduling again replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms.saturating_add(self.delay_ms));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    /// Fires at most once per schedule.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(deadline) if now_ms >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_MS)
    }
}

// ─── Persistence ─────────────────────────────────────────────────────────

pub struct SnapshotPersistence<S> {
    storage: S,
    key: String,
    format: SnapshotFormat,
    debouncer: Debouncer,
    writes: u64,
}

impl<S: SnapshotStorage> SnapshotPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: DEFAULT_STORAGE_KEY.to_string(),
            format: SnapshotFormat::default(),
            debouncer: Debouncer::default(),
            writes: 0,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_debounce(mut self, delay_ms: u64) -> Self {
        self.debouncer = Debouncer::new(delay_ms);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Schedule a write for a batch of store events. Empty batches do
    /// nothing.
    pub fn observe(&mut self, events: &[StoreEvent], now_ms: u64) {
        if !events.is_empty() {
            self.debouncer.schedule(now_ms);
        }
    }

    /// Schedule a write for state the store does not track (viewport,
    /// configuration, overlays).
    pub fn mark_dirty(&mut self, now_ms: u64) {
        self.debouncer.schedule(now_ms);
    }

    /// Write if the debounce deadline has passed. `source` is only called
    /// when a write is due. Returns whether a snapshot was written.
    pub fn poll(&mut self, now_ms: u64, source: impl FnOnce() -> Snapshot) -> bool {
        if !self.debouncer.poll(now_ms) {
            return false;
        }
        match self.write(&source()) {
            Ok(()) => true,
            Err(err) => {
                log::warn!("snapshot write to {} failed: {err}", self.storage.name());
                false
            }
        }
    }

    /// Write now, dropping any pending deadline.
    pub fn flush(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.debouncer.cancel();
        self.write(snapshot)
    }

    fn write(&mut self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let bytes = snapshot.encode(self.format)?;
        self.storage.put(&self.key, &bytes)?;
        self.writes += 1;
        log::info!(
            "saved snapshot ({} node(s), {} edge(s)) to {}",
            snapshot.nodes.len(),
            snapshot.edges.len(),
            self.storage.name()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<Snapshot, SnapshotError> {
        let bytes = self
            .storage
            .get(&self.key)?
            .ok_or_else(|| SnapshotError::Missing(self.key.clone()))?;
        Snapshot::decode(&bytes, self.format)
    }
}
