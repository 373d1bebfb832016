//! Reflection Store Boundary
//!
//! Reflections are owned by a remote store (a hosted Postgres in production,
//! the local SQLite `Storage` for the CLI and tests). The core only needs
//! row-level create/read/update/delete plus one settings blob per user.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::{quality_score, word_count};
use crate::storage::Result;
use crate::sync::SettingsBlob;

/// Prefix for ids minted locally when the store write failed
pub const LOCAL_ID_PREFIX: &str = "local-";

/// True for records that only exist in the local pending list
pub fn is_local_id(id: &str) -> bool {
    id.starts_with(LOCAL_ID_PREFIX)
}

/// Mint an id for a local-only record
pub fn new_local_id() -> String {
    format!("{}{}", LOCAL_ID_PREFIX, uuid::Uuid::new_v4())
}

/// One answered prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: String,
    pub user: String,
    pub question_id: u32,
    pub category: String,
    pub response_text: String,
    pub word_count: u32,
    pub quality_score: f64,
    /// `None` when the stored timestamp was missing or unparseable
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Reflection {
    /// UTC calendar day the reflection was written
    pub fn created_day(&self) -> Option<NaiveDate> {
        self.created_at.map(|t| t.date_naive())
    }

    pub fn is_local(&self) -> bool {
        is_local_id(&self.id)
    }
}

/// Input for creating a reflection; derived fields are computed on insert
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReflection {
    pub user: String,
    pub question_id: u32,
    pub category: String,
    pub response_text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewReflection {
    /// Materialize with the given id and timestamp, deriving word count and quality
    pub fn into_reflection(self, id: String, created_at: DateTime<Utc>) -> Reflection {
        let words = word_count(&self.response_text);
        let quality = quality_score(&self.response_text, words);
        Reflection {
            id,
            user: self.user,
            question_id: self.question_id,
            category: self.category,
            response_text: self.response_text,
            word_count: words,
            quality_score: quality,
            created_at: Some(created_at),
            tags: self.tags,
        }
    }
}

/// Row-level access to the reflection store
pub trait ReflectionStore: Send + Sync {
    fn create_reflection(&self, input: NewReflection) -> Result<Reflection>;

    /// Store an already-materialized record (a local-only save being pushed),
    /// keeping its timestamp and derived fields. Returns it with a server id.
    fn import_reflection(&self, reflection: &Reflection) -> Result<Reflection>;

    /// All reflections for a user, newest first
    fn list_reflections(&self, user: &str) -> Result<Vec<Reflection>>;

    fn get_reflection(&self, id: &str) -> Result<Option<Reflection>>;

    /// Replace the response text, recomputing word count and quality
    fn update_reflection(&self, id: &str, response_text: &str) -> Result<Reflection>;

    /// Returns whether a row was deleted
    fn delete_reflection(&self, id: &str) -> Result<bool>;

    fn read_settings(&self, user: &str) -> Result<Option<SettingsBlob>>;

    fn write_settings(&self, user: &str, blob: &SettingsBlob) -> Result<()>;
}

impl<T: ReflectionStore + ?Sized> ReflectionStore for std::sync::Arc<T> {
    fn create_reflection(&self, input: NewReflection) -> Result<Reflection> {
        (**self).create_reflection(input)
    }

    fn import_reflection(&self, reflection: &Reflection) -> Result<Reflection> {
        (**self).import_reflection(reflection)
    }

    fn list_reflections(&self, user: &str) -> Result<Vec<Reflection>> {
        (**self).list_reflections(user)
    }

    fn get_reflection(&self, id: &str) -> Result<Option<Reflection>> {
        (**self).get_reflection(id)
    }

    fn update_reflection(&self, id: &str, response_text: &str) -> Result<Reflection> {
        (**self).update_reflection(id, response_text)
    }

    fn delete_reflection(&self, id: &str) -> Result<bool> {
        (**self).delete_reflection(id)
    }

    fn read_settings(&self, user: &str) -> Result<Option<SettingsBlob>> {
        (**self).read_settings(user)
    }

    fn write_settings(&self, user: &str, blob: &SettingsBlob) -> Result<()> {
        (**self).write_settings(user, blob)
    }
}
