//! Settings sync
//!
//! Settings live in two places: the local key-value store and the remote
//! reflection store. Conflicts resolve last-write-wins on `updated_at`.
//!
//! Outbound writes go through `SyncDebouncer`, which keeps one pending
//! timer per key and only writes the latest value once edits go quiet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::remote::ReflectionStore;
use crate::storage::{Result, StorageError};

/// Default quiet period before a debounced write goes out
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

// ============================================================================
// SETTINGS BLOB
// ============================================================================

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Free-form user settings with a last-write timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsBlob {
    #[serde(default = "schema_version")]
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub values: Map<String, Value>,
}

impl Default for SettingsBlob {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            updated_at: Utc::now(),
            values: Map::new(),
        }
    }
}

impl Versioned for SettingsBlob {
    fn version(&self) -> u32 {
        self.version
    }
}

impl SettingsBlob {
    /// Set a value and bump `updated_at`
    pub fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
        self.updated_at = Utc::now();
    }

    /// Remove a value, bumping `updated_at` if it existed
    pub fn unset(&mut self, key: &str) -> bool {
        let removed = self.values.remove(key).is_some();
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Which copy won a resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsSource {
    Local,
    Remote,
}

/// Last-write-wins between two copies. Ties go to the remote copy.
pub fn resolve_settings(
    local: Option<SettingsBlob>,
    remote: Option<SettingsBlob>,
) -> Option<(SettingsBlob, SettingsSource)> {
    match (local, remote) {
        (None, None) => None,
        (Some(l), None) => Some((l, SettingsSource::Local)),
        (None, Some(r)) => Some((r, SettingsSource::Remote)),
        (Some(l), Some(r)) => {
            if l.updated_at > r.updated_at {
                Some((l, SettingsSource::Local))
            } else {
                Some((r, SettingsSource::Remote))
            }
        }
    }
}

pub fn load_local_settings<S: KeyValueStore + ?Sized>(
    store: &S,
    user: &str,
) -> Result<Option<SettingsBlob>> {
    kv::load_json(store, &kv::keys::settings(user))
}

pub fn save_local_settings<S: KeyValueStore + ?Sized>(
    store: &S,
    user: &str,
    blob: &SettingsBlob,
) -> Result<()> {
    kv::save_json(store, &kv::keys::settings(user), blob)
}

/// Reconcile local and remote settings, writing the winner to the other side.
///
/// A failed remote read falls back to the local copy without writing.
pub fn sync_settings<S, R>(store: &S, remote: &R, user: &str) -> Result<SettingsBlob>
where
    S: KeyValueStore + ?Sized,
    R: ReflectionStore + ?Sized,
{
    let local = load_local_settings(store, user)?;
    let remote_copy = match remote.read_settings(user) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(user, error = %e, "Remote settings unavailable, using local copy");
            return Ok(local.unwrap_or_default());
        }
    };

    match resolve_settings(local, remote_copy) {
        None => Ok(SettingsBlob::default()),
        Some((blob, SettingsSource::Local)) => {
            remote.write_settings(user, &blob)?;
            tracing::debug!(user, "Pushed local settings");
            Ok(blob)
        }
        Some((blob, SettingsSource::Remote)) => {
            save_local_settings(store, user, &blob)?;
            tracing::debug!(user, "Pulled remote settings");
            Ok(blob)
        }
    }
}

// ============================================================================
// DEBOUNCED WRITES
// ============================================================================

/// Destination for debounced writes
pub trait SyncSink: Send + Sync + 'static {
    fn push(&self, key: &str, value: &Value) -> Result<()>;
}

/// Writes settings blobs to a reflection store, keyed by user
pub struct RemoteSettingsSink<R: ReflectionStore + 'static> {
    remote: Arc<R>,
}

impl<R: ReflectionStore + 'static> RemoteSettingsSink<R> {
    pub fn new(remote: Arc<R>) -> Self {
        Self { remote }
    }
}

impl<R: ReflectionStore + 'static> SyncSink for RemoteSettingsSink<R> {
    fn push(&self, user: &str, value: &Value) -> Result<()> {
        let blob: SettingsBlob =
            serde_json::from_value(value.clone()).map_err(StorageError::Serialization)?;
        self.remote.write_settings(user, &blob)
    }
}

struct Pending {
    generation: u64,
    value: Value,
    handle: JoinHandle<()>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Coalesces rapid writes per key into one delayed write
///
/// `schedule` must be called from inside a tokio runtime.
pub struct SyncDebouncer {
    sink: Arc<dyn SyncSink>,
    delay: Duration,
    pending: PendingMap,
    generation: Mutex<u64>,
}

impl SyncDebouncer {
    pub fn new(sink: Arc<dyn SyncSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            generation: Mutex::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        match self.generation.lock() {
            Ok(mut g) => {
                *g += 1;
                *g
            }
            Err(poisoned) => {
                let mut g = poisoned.into_inner();
                *g += 1;
                *g
            }
        }
    }

    /// Replace any pending write for `key` and restart its timer
    pub fn schedule(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let generation = self.next_generation();

        let Ok(mut pending) = self.pending.lock() else {
            tracing::warn!(key, "Debouncer state poisoned, dropping write");
            return;
        };

        if let Some(previous) = pending.remove(&key) {
            previous.handle.abort();
        }

        let sink = Arc::clone(&self.sink);
        let map = Arc::clone(&self.pending);
        let delay = self.delay;
        let task_key = key.clone();
        let task_value = value.clone();

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if let Err(e) = sink.push(&task_key, &task_value) {
                tracing::warn!(key = %task_key, error = %e, "Debounced sync failed");
            }

            // Only clear our own entry; a newer schedule may have replaced it
            if let Ok(mut pending) = map.lock() {
                if pending.get(&task_key).is_some_and(|p| p.generation == generation) {
                    pending.remove(&task_key);
                }
            }
        });

        pending.insert(
            key,
            Pending {
                generation,
                value,
                handle,
            },
        );
    }

    /// Number of keys waiting on a timer
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Cancel all timers and write every pending value now.
    ///
    /// Returns how many writes succeeded.
    pub fn flush(&self) -> usize {
        let drained: Vec<(String, Pending)> = match self.pending.lock() {
            Ok(mut pending) => pending.drain().collect(),
            Err(_) => return 0,
        };

        let mut written = 0;
        for (key, entry) in drained {
            entry.handle.abort();
            match self.sink.push(&key, &entry.value) {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!(key, error = %e, "Flush write failed"),
            }
        }
        written
    }
}

impl Drop for SyncDebouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            for (_, entry) in pending.drain() {
                entry.handle.abort();
            }
        }
    }
}
