//! SQLite Storage Implementation
//!
//! Local stand-in for the hosted reflection store, plus the key-value table
//! that backs journal state.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Mutex;
use uuid::Uuid;

use crate::kv::KeyValueStore;
use crate::remote::{NewReflection, Reflection, ReflectionStore};
use crate::stats::{quality_score, word_count};
use crate::sync::SettingsBlob;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Blob (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Invalid timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// Initialization error
    #[error("Initialization error: {0}")]
    Init(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// STORAGE
// ============================================================================

/// SQLite-backed reflection store and key-value store
///
/// Uses separate reader/writer connections for interior mutability.
/// All methods take `&self`, so `Storage` is `Send + Sync` and can be
/// shared as `Arc<Storage>` between the journal and the sync task.
pub struct Storage {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    path: PathBuf,
}

impl Storage {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("ECHOES_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Default database location in the platform data directory
    pub fn default_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "echoes", "echoes").ok_or_else(|| {
            StorageError::Init("Could not determine project directories".to_string())
        })?;

        let data_dir = proj_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;
        // Restrict directory permissions to owner-only on Unix
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            let _ = std::fs::set_permissions(data_dir, perms);
        }
        Ok(data_dir.join("echoes.db"))
    }

    /// Open (or create) storage; `None` uses the platform data directory
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => {
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                p
            }
            None => Self::default_path()?,
        };

        let writer_conn = Connection::open(&path)?;

        // Reflections are personal; owner-only on Unix
        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;

        // Apply migrations on writer only
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        tracing::debug!(path = %path.display(), "Storage opened");

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            path,
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn writer(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.writer
            .lock()
            .map_err(|_| StorageError::Init("Writer lock poisoned".into()))
    }

    fn reader(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.reader
            .lock()
            .map_err(|_| StorageError::Init("Reader lock poisoned".into()))
    }

    /// Lenient timestamp parse: bad values become `None` so the row still loads
    fn parse_timestamp(value: Option<String>, id: &str) -> Option<DateTime<Utc>> {
        let raw = value?;
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                tracing::warn!(reflection = id, value = %raw, error = %e, "Unparseable created_at");
                None
            }
        }
    }

    fn row_to_reflection(row: &rusqlite::Row) -> rusqlite::Result<Reflection> {
        let id: String = row.get("id")?;
        let tags_json: Option<String> = row.get("tags")?;
        let tags: Vec<String> = tags_json
            .and_then(|t| serde_json::from_str(&t).ok())
            .unwrap_or_default();
        let created_at = Self::parse_timestamp(row.get("created_at")?, &id);

        Ok(Reflection {
            user: row.get("user_id")?,
            question_id: row.get("question_id")?,
            category: row.get("category")?,
            response_text: row.get("response_text")?,
            word_count: row.get("word_count")?,
            quality_score: row.get("quality_score")?,
            created_at,
            tags,
            id,
        })
    }

    fn insert_row(&self, r: &Reflection) -> Result<()> {
        let tags = serde_json::to_string(&r.tags)?;
        let created = r.created_at.map(|t| t.to_rfc3339());
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO reflections (
                id, user_id, question_id, category, response_text,
                word_count, quality_score, created_at, updated_at, tags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8, ?9)",
            params![
                r.id,
                r.user.trim().to_lowercase(),
                r.question_id,
                r.category,
                r.response_text,
                r.word_count,
                r.quality_score,
                created,
                tags,
            ],
        )?;
        Ok(())
    }

    /// Reflection count for a user
    pub fn count_reflections(&self, user: &str) -> Result<i64> {
        let reader = self.reader()?;
        let count = reader.query_row(
            "SELECT COUNT(*) FROM reflections WHERE user_id = ?1",
            params![user.trim().to_lowercase()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Keys in the key-value table with the given prefix
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare("SELECT key FROM kv_store WHERE key LIKE ?1 ESCAPE '\\' ORDER BY key")?;
        let pattern = format!(
            "{}%",
            prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
        );
        let keys = stmt
            .query_map(params![pattern], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }
}

impl KeyValueStore for Storage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let reader = self.reader()?;
        let value = reader
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }
}

impl ReflectionStore for Storage {
    fn create_reflection(&self, input: NewReflection) -> Result<Reflection> {
        let reflection = input.into_reflection(Uuid::new_v4().to_string(), Utc::now());
        self.insert_row(&reflection)?;
        tracing::info!(
            id = %reflection.id,
            question = reflection.question_id,
            words = reflection.word_count,
            "Reflection saved"
        );
        Ok(reflection)
    }

    fn import_reflection(&self, reflection: &Reflection) -> Result<Reflection> {
        let mut stored = reflection.clone();
        stored.id = Uuid::new_v4().to_string();
        self.insert_row(&stored)?;
        tracing::info!(local = %reflection.id, id = %stored.id, "Local reflection pushed");
        Ok(stored)
    }

    fn list_reflections(&self, user: &str) -> Result<Vec<Reflection>> {
        let reader = self.reader()?;
        let mut stmt = reader.prepare(
            "SELECT * FROM reflections WHERE user_id = ?1 ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
            .query_map(params![user.trim().to_lowercase()], Self::row_to_reflection)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn get_reflection(&self, id: &str) -> Result<Option<Reflection>> {
        let reader = self.reader()?;
        let row = reader
            .query_row(
                "SELECT * FROM reflections WHERE id = ?1",
                params![id],
                Self::row_to_reflection,
            )
            .optional()?;
        Ok(row)
    }

    fn update_reflection(&self, id: &str, response_text: &str) -> Result<Reflection> {
        let words = word_count(response_text);
        let quality = quality_score(response_text, words);
        {
            let writer = self.writer()?;
            let rows = writer.execute(
                "UPDATE reflections
                 SET response_text = ?1, word_count = ?2, quality_score = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![response_text, words, quality, Utc::now().to_rfc3339(), id],
            )?;
            if rows == 0 {
                return Err(StorageError::NotFound(id.to_string()));
            }
        }
        self.get_reflection(id)?
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    fn delete_reflection(&self, id: &str) -> Result<bool> {
        let writer = self.writer()?;
        let rows = writer.execute("DELETE FROM reflections WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    fn read_settings(&self, user: &str) -> Result<Option<SettingsBlob>> {
        let reader = self.reader()?;
        let raw: Option<String> = reader
            .query_row(
                "SELECT settings FROM user_settings WHERE user_id = ?1",
                params![user.trim().to_lowercase()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.and_then(|s| match serde_json::from_str::<SettingsBlob>(&s) {
            Ok(blob) => Some(blob),
            Err(e) => {
                tracing::warn!(user, error = %e, "Ignoring corrupt settings row");
                None
            }
        }))
    }

    fn write_settings(&self, user: &str, blob: &SettingsBlob) -> Result<()> {
        let json = serde_json::to_string(blob)?;
        let writer = self.writer()?;
        writer.execute(
            "INSERT INTO user_settings (user_id, settings, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET settings = excluded.settings, updated_at = excluded.updated_at",
            params![user.trim().to_lowercase(), json, blob.updated_at.to_rfc3339()],
        )?;
        Ok(())
    }
}
