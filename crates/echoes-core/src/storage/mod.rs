//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Reflection rows (the local stand-in for the hosted store)
//! - A key-value table for journal state
//! - Per-user settings blobs

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, Storage, StorageError};
