//! Test Journal Manager
//!
//! Provides isolated journal instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A reflection store that can be taken offline
//! - Reopening the same database to check persistence

use std::path::PathBuf;
use std::sync::Arc;

use echoes_core::{Journal, QuestionCatalog, Reflection, ReflectionStore, SelectionConfig, Storage};
use tempfile::TempDir;

use crate::mocks::FlakyStore;

pub type E2eJournal = Journal<Arc<Storage>, Arc<FlakyStore>>;

/// Journal over a temporary database
///
/// Local state goes straight to `storage`; reflections go through `remote`,
/// which wraps the same database and can be switched offline.
///
/// # Example
///
/// ```rust,ignore
/// let t = TestJournal::new_temp();
/// let pair = t.journal.today("a@x.com", day)?;
///
/// t.remote.go_offline();
/// let saved = t.journal.answer("a@x.com", day, Period::Morning, "...", vec![])?;
/// assert!(!saved.synced);
/// ```
pub struct TestJournal {
    pub journal: E2eJournal,
    pub storage: Arc<Storage>,
    pub remote: Arc<FlakyStore>,
    config: SelectionConfig,
    db_path: PathBuf,
    /// Kept alive so the database outlives the journal
    _temp_dir: Arc<TempDir>,
}

impl TestJournal {
    /// Builtin catalog, skip priority off so selection is fully deterministic
    pub fn new_temp() -> Self {
        Self::with_config(SelectionConfig {
            skip_priority_probability: 0.0,
            ..SelectionConfig::default()
        })
    }

    pub fn with_config(config: SelectionConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_echoes.db");
        Self::open(Arc::new(temp_dir), db_path, config)
    }

    fn open(temp_dir: Arc<TempDir>, db_path: PathBuf, config: SelectionConfig) -> Self {
        let storage =
            Arc::new(Storage::new(Some(db_path.clone())).expect("Failed to create test storage"));
        let remote = Arc::new(FlakyStore::new(Arc::clone(&storage)));
        let catalog = QuestionCatalog::builtin().expect("Builtin catalog");
        let journal = Journal::new(
            catalog,
            Arc::clone(&storage),
            Arc::clone(&remote),
            config.clone(),
        );

        Self {
            journal,
            storage,
            remote,
            config,
            db_path,
            _temp_dir: temp_dir,
        }
    }

    /// Close and reopen the same database, as a restarted process would
    pub fn reopen(self) -> Self {
        let Self {
            journal,
            storage,
            remote,
            config,
            db_path,
            _temp_dir,
        } = self;
        drop(journal);
        drop(remote);
        drop(storage);
        Self::open(_temp_dir, db_path, config)
    }

    /// Get the database path
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Stored reflection count, bypassing the offline switch
    pub fn stored_reflections(&self, user: &str) -> i64 {
        self.storage.count_reflections(user).unwrap_or(0)
    }

    /// Read a reflection straight from the database
    pub fn storage_reflection(&self, id: &str) -> Reflection {
        self.storage
            .get_reflection(id)
            .expect("Failed to read reflection")
            .expect("Reflection not stored")
    }
}
