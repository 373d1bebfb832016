//! # Echoes Core
//!
//! Journaling engine behind Echoes of Me: two reflective questions a day,
//! written answers, and a picture of progress over time.
//!
//! - **Deterministic Daily Selection**: one morning and one afternoon question per
//!   user per day, seeded from `"{user}-{period}-{date}"` and locked once chosen
//! - **Skip Pool**: rerolled questions are remembered and resurface later with a
//!   configurable priority
//! - **Answered Set**: per-category cache of answered questions so fresh picks
//!   avoid anything answered recently
//! - **Progress Aggregator**: totals, categories, average quality, current and
//!   longest streaks, completion toward 2,500 reflections and the next milestone
//! - **Partial Saves**: a failed store write keeps the answer locally under a
//!   `local-` id until `sync_pending` pushes it
//! - **Settings Sync**: last-write-wins reconciliation plus a debounced writer
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use echoes_core::{Journal, Period, QuestionCatalog, SelectionConfig, Storage};
//!
//! let storage = Arc::new(Storage::new(None)?);
//! let journal = Journal::new(
//!     QuestionCatalog::builtin()?,
//!     storage.clone(),
//!     storage,
//!     SelectionConfig::default(),
//! );
//!
//! let today = chrono::Utc::now().date_naive();
//! let pair = journal.today("a@x.com", today)?;
//! journal.answer("a@x.com", today, Period::Morning, "I remember...", vec![])?;
//! let report = journal.stats("a@x.com", today)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): Compile SQLite into the binary
//! - `encryption`: SQLCipher, keyed from `ECHOES_ENCRYPTION_KEY`

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod catalog;
pub mod config;
pub mod error;
pub mod journal;
pub mod kv;
pub mod remote;
pub mod selection;
pub mod stats;
pub mod storage;
pub mod sync;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Questions
pub use catalog::{CatalogError, Question, QuestionCatalog};

// Daily selection
pub use selection::{
    seed_hash, AnsweredSet, DailyPair, DailySelector, LockedDailySelection, Period,
    SelectionConfig, SkipPool, SkipPoolEntry, MAX_RECENT_WINDOW_DAYS,
};

// Progress
pub use stats::{
    compute_stats, current_streak, longest_streak, quality_score, word_count, Milestone, Stats,
    StatsDelta, StatsHistory, StatsSnapshot, COMPLETION_TARGET, MILESTONES,
};

// Reflections and local state
pub use kv::{KeyValueStore, MemoryStore};
pub use remote::{is_local_id, NewReflection, Reflection, ReflectionStore, LOCAL_ID_PREFIX};
pub use storage::{Storage, StorageError};

// Settings
pub use sync::{
    resolve_settings, sync_settings, RemoteSettingsSink, SettingsBlob, SettingsSource,
    SyncDebouncer, SyncSink,
};

// Orchestration
pub use config::EchoesConfig;
pub use error::{EchoesError, Result};
pub use journal::{Journal, SavedReflection, StatsReport, SyncReport};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        EchoesConfig, EchoesError, Journal, KeyValueStore, Period, Question, QuestionCatalog,
        Reflection, ReflectionStore, Result, SelectionConfig, Stats, Storage,
    };
}
