//! Identity Persistence and Recovery
//!
//! Keeps the device hash recoverable across sessions by mirroring it into
//! several storage backends at once. Backends are held in priority order:
//! the first three slots are the fast tier and are consulted sequentially,
//! everything after them is the slow tier and is only probed concurrently
//! when the fast tier comes up empty. A hit in the fast tier returns without
//! the slow tier ever being awaited.
//!
//! Every backend speaks the same contract: store an opaque string, give it
//! back, report a stable name for logging. Individual backend failures are
//! logged and absorbed; persistence is best-effort by design and never fails
//! a generation pass.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dp_error::{DeviceprintError, Result};

/// Number of priority slots consulted sequentially before the concurrent tail
const FAST_SLOTS: usize = 3;

// ============================================================================
// Backend contract
// ============================================================================

/// Uniform async contract every storage backend implements.
///
/// Values are opaque strings; payload framing belongs to the manager. A
/// backend that cannot currently serve (medium missing, quota hit) returns an
/// error rather than inventing an empty read.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Read the stored value, `Ok(None)` when nothing was ever written
    async fn get(&self) -> Result<Option<String>>;

    /// Write the value, replacing any previous one
    async fn put(&self, value: &str) -> Result<()>;

    /// Stable backend name used in log fields
    fn name(&self) -> &'static str;
}

// ============================================================================
// Payload framing
// ============================================================================

/// Envelope written to every backend. Field names are single letters to keep
/// the footprint small in size-constrained backends; the format is shared
/// with older deployments and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedPayload {
    /// The device hash
    pub h: String,
    /// Write timestamp, unix millis
    pub t: u64,
}

impl PersistedPayload {
    pub fn new(hash: &str) -> Self {
        Self {
            h: hash.to_string(),
            t: current_timestamp_ms(),
        }
    }

    fn encode(&self) -> String {
        // Serializing two plain fields cannot fail; fall back to the bare
        // hash so a serializer regression degrades instead of dropping data
        serde_json::to_string(self).unwrap_or_else(|_| self.h.clone())
    }

    /// Decode a stored value. A value that does not parse as an envelope
    /// reads as empty, so a corrupted slot neither masks lower-priority
    /// slots during recovery nor blocks its own repair during resync.
    fn decode(raw: &str) -> Option<String> {
        match serde_json::from_str::<Self>(raw) {
            Ok(payload) if !payload.h.is_empty() => Some(payload.h),
            _ => None,
        }
    }
}

// ============================================================================
// Persistence manager
// ============================================================================

/// Coordinates recovery, replication, and repair across the backend set
pub struct PersistenceManager {
    backends: Vec<Arc<dyn StorageBackend>>,
}

impl PersistenceManager {
    /// Build a manager over backends in descending priority order.
    pub fn new(backends: Vec<Arc<dyn StorageBackend>>) -> Self {
        Self { backends }
    }

    /// Default backend set: in-process memory first, then the on-disk store.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(vec![
            Arc::new(MemoryBackend::new()),
            Arc::new(FileBackend::at_default_path()?),
        ]))
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Recover a previously persisted hash.
    ///
    /// Fast-tier backends are awaited one at a time in priority order and a
    /// hit short-circuits immediately. Only when all of them miss is the slow
    /// tier probed, concurrently, with ties broken by priority order.
    pub async fn recover(&self) -> Option<String> {
        for backend in self.backends.iter().take(FAST_SLOTS) {
            match backend.get().await {
                Ok(Some(raw)) => {
                    if let Some(hash) = PersistedPayload::decode(&raw) {
                        debug!(backend = backend.name(), "Recovered identity");
                        return Some(hash);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Recovery read failed");
                }
            }
        }

        let tail: Vec<_> = self
            .backends
            .iter()
            .skip(FAST_SLOTS)
            .map(|backend| {
                let backend = Arc::clone(backend);
                tokio::spawn(async move {
                    let name = backend.name();
                    (name, backend.get().await)
                })
            })
            .collect();

        let mut recovered = None;
        for handle in tail {
            let Ok((name, result)) = handle.await else {
                continue;
            };
            match result {
                Ok(Some(raw)) => {
                    if recovered.is_none() {
                        if let Some(hash) = PersistedPayload::decode(&raw) {
                            debug!(backend = name, "Recovered identity from slow tier");
                            recovered = Some(hash);
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(backend = name, error = %e, "Recovery read failed"),
            }
        }
        recovered
    }

    /// Replicate the hash to every backend, best-effort.
    ///
    /// Fast-tier writes run sequentially in priority order, the slow tier
    /// concurrently. Failures are logged and do not abort the remaining
    /// writes. Returns the number of backends that accepted the write.
    pub async fn persist(&self, hash: &str) -> usize {
        let value = PersistedPayload::new(hash).encode();
        let mut written = 0usize;

        for backend in self.backends.iter().take(FAST_SLOTS) {
            match backend.put(&value).await {
                Ok(()) => written += 1,
                Err(e) => warn!(backend = backend.name(), error = %e, "Persist write failed"),
            }
        }

        let tail: Vec<_> = self
            .backends
            .iter()
            .skip(FAST_SLOTS)
            .map(|backend| {
                let backend = Arc::clone(backend);
                let value = value.clone();
                tokio::spawn(async move {
                    let name = backend.name();
                    (name, backend.put(&value).await)
                })
            })
            .collect();

        for handle in tail {
            match handle.await {
                Ok((_, Ok(()))) => written += 1,
                Ok((name, Err(e))) => {
                    warn!(backend = name, error = %e, "Persist write failed")
                }
                Err(_) => {}
            }
        }

        debug!(written, total = self.backends.len(), "Persisted identity");
        written
    }

    /// Repair backends that lost the hash.
    ///
    /// Re-reads every backend and writes the canonical hash only where the
    /// read came back empty or failed. A backend holding a different value is
    /// left untouched; resync repairs gaps, it does not arbitrate conflicts.
    /// Returns the number of backends repaired.
    pub async fn resync(&self, hash: &str) -> usize {
        let value = PersistedPayload::new(hash).encode();
        let mut repaired = 0usize;

        for backend in &self.backends {
            let is_empty = match backend.get().await {
                Ok(Some(raw)) => PersistedPayload::decode(&raw).is_none(),
                Ok(None) => true,
                Err(_) => true,
            };
            if is_empty {
                match backend.put(&value).await {
                    Ok(()) => {
                        debug!(backend = backend.name(), "Resynced identity");
                        repaired += 1;
                    }
                    Err(e) => {
                        warn!(backend = backend.name(), error = %e, "Resync write failed")
                    }
                }
            }
        }
        repaired
    }
}

// ============================================================================
// Memory backend
// ============================================================================

/// Process-lifetime backend; survives regeneration within a session only
pub struct MemoryBackend {
    value: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self) -> Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    async fn put(&self, value: &str) -> Result<()> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// File backend
// ============================================================================

/// On-disk backend, one small JSON file under the user data directory
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// A persisted payload is under 200 bytes; anything near this limit is
    /// corruption or tampering
    const MAX_FILE_SIZE: u64 = 64 * 1024;
    const STORE_FILENAME: &'static str = "identity.json";

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Backend rooted at `<config_dir>/deviceprint/identity.json`.
    pub fn at_default_path() -> Result<Self> {
        let dir = dirs::config_dir().ok_or_else(|| {
            DeviceprintError::backend_unavailable("file", "no user config directory")
        })?;
        Ok(Self::new(dir.join("deviceprint").join(Self::STORE_FILENAME)))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn get(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let metadata = fs::metadata(&self.path).map_err(|e| DeviceprintError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        if metadata.len() > Self::MAX_FILE_SIZE {
            return Err(DeviceprintError::FileTooLarge {
                path: self.path.clone(),
                size: metadata.len(),
                max_size: Self::MAX_FILE_SIZE,
            });
        }

        let content = fs::read_to_string(&self.path).map_err(|e| DeviceprintError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(content))
    }

    async fn put(&self, value: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| DeviceprintError::FileWrite {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        // Atomic write: temp file in the same directory, fsync, rename
        use std::io::Write;
        let temp_path = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path).map_err(|e| DeviceprintError::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;
        file.write_all(value.as_bytes())
            .map_err(|e| DeviceprintError::FileWrite {
                path: temp_path.clone(),
                source: e,
            })?;
        file.sync_all().map_err(|e| DeviceprintError::FileWrite {
            path: temp_path.clone(),
            source: e,
        })?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| DeviceprintError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;

        debug!(path = ?self.path, "Saved identity store");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
