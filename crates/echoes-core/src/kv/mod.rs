//! Key-Value Module
//!
//! The local persisted state (answered sets, skip pools, daily locks, stats
//! history, pending reflections, settings) lives behind a tiny string
//! key-value interface so any backend can hold it:
//! - `MemoryStore` for tests and ephemeral sessions
//! - `Storage` (SQLite) for the CLI
//!
//! Values are JSON blobs. Every blob carries a `version` field; a blob that
//! fails to parse, or that was written with a different schema version, is
//! treated as absent rather than surfaced as an error.

mod memory;

pub use memory::MemoryStore;

use serde::{de::DeserializeOwned, Serialize};

use crate::storage::{Result, StorageError};

/// Schema version stamped on every persisted blob
pub const SCHEMA_VERSION: u32 = 1;

/// Minimal string key-value store
///
/// All methods take `&self`; implementations provide their own interior
/// mutability so stores can be shared behind `Arc`.
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when the key is absent
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Insert or overwrite a value
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Remove a key, returns whether it existed
    fn delete(&self, key: &str) -> Result<bool>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key)
    }
}

/// Blobs that carry a schema version
pub trait Versioned {
    fn version(&self) -> u32;
}

/// Load a versioned JSON blob.
///
/// Corrupt JSON and version mismatches come back as `Ok(None)` with a warning;
/// only backend failures are errors.
pub fn load_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned + Versioned,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };

    match serde_json::from_str::<T>(&raw) {
        Ok(value) if value.version() == SCHEMA_VERSION => Ok(Some(value)),
        Ok(value) => {
            tracing::warn!(
                key,
                found = value.version(),
                expected = SCHEMA_VERSION,
                "Ignoring blob with unknown schema version"
            );
            Ok(None)
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring corrupt blob");
            Ok(None)
        }
    }
}

/// Serialize and store a blob
pub fn save_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(StorageError::Serialization)?;
    store.set(key, &raw)
}

/// Per-user key layout
///
/// Users are namespaced by their identifier (normally an email address),
/// lowercased so `A@x.com` and `a@x.com` share state.
pub mod keys {
    use chrono::NaiveDate;

    use crate::selection::Period;

    fn user_prefix(user: &str) -> String {
        format!("echoes:{}", user.trim().to_lowercase())
    }

    pub fn answered(user: &str) -> String {
        format!("{}:answered", user_prefix(user))
    }

    pub fn skip_pool(user: &str) -> String {
        format!("{}:skip_pool", user_prefix(user))
    }

    pub fn daily(user: &str, date: NaiveDate, period: Period) -> String {
        format!("{}:daily:{}:{}", user_prefix(user), date.format("%Y-%m-%d"), period)
    }

    pub fn stats_history(user: &str) -> String {
        format!("{}:stats_history", user_prefix(user))
    }

    pub fn pending_reflections(user: &str) -> String {
        format!("{}:pending_reflections", user_prefix(user))
    }

    pub fn settings(user: &str) -> String {
        format!("{}:settings", user_prefix(user))
    }
}
