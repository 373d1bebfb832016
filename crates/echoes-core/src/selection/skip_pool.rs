//! Skip pool
//!
//! Questions a user rerolled away from. Each reroll bumps the entry's count
//! and timestamp; answering the question removes it. The pool is one blob
//! per user and writes are last-writer-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::storage::Result;

/// One deferred question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipPoolEntry {
    pub question_id: u32,
    /// Always at least 1
    pub skip_count: u32,
    pub last_skipped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SkipPoolBlob {
    version: u32,
    entries: Vec<SkipPoolEntry>,
}

impl Versioned for SkipPoolBlob {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Skip pool for one user
pub struct SkipPool<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    key: String,
}

impl<'a, S: KeyValueStore + ?Sized> SkipPool<'a, S> {
    pub fn new(store: &'a S, user: &str) -> Self {
        Self {
            store,
            key: kv::keys::skip_pool(user),
        }
    }

    fn load(&self) -> Result<Vec<SkipPoolEntry>> {
        Ok(kv::load_json::<SkipPoolBlob, _>(self.store, &self.key)?
            .map(|b| b.entries)
            .unwrap_or_default())
    }

    fn save(&self, entries: Vec<SkipPoolEntry>) -> Result<()> {
        kv::save_json(
            self.store,
            &self.key,
            &SkipPoolBlob {
                version: SCHEMA_VERSION,
                entries,
            },
        )
    }

    /// Record a skip now
    pub fn add(&self, question_id: u32) -> Result<SkipPoolEntry> {
        self.add_at(question_id, Utc::now())
    }

    /// Record a skip at a given time, inserting or incrementing the entry
    pub fn add_at(&self, question_id: u32, at: DateTime<Utc>) -> Result<SkipPoolEntry> {
        let mut entries = self.load()?;

        let entry = match entries.iter_mut().find(|e| e.question_id == question_id) {
            Some(existing) => {
                existing.skip_count += 1;
                existing.last_skipped_at = at;
                existing.clone()
            }
            None => {
                let entry = SkipPoolEntry {
                    question_id,
                    skip_count: 1,
                    last_skipped_at: at,
                };
                entries.push(entry.clone());
                entry
            }
        };

        self.save(entries)?;
        tracing::debug!(question = question_id, count = entry.skip_count, "Question skipped");
        Ok(entry)
    }

    /// Drop an entry, returns whether it was present
    pub fn remove(&self, question_id: u32) -> Result<bool> {
        let mut entries = self.load()?;
        let before = entries.len();
        entries.retain(|e| e.question_id != question_id);
        if entries.len() == before {
            return Ok(false);
        }
        self.save(entries)?;
        Ok(true)
    }

    /// Ids only, for building exclusion sets
    pub fn list(&self) -> Result<Vec<u32>> {
        Ok(self.load()?.into_iter().map(|e| e.question_id).collect())
    }

    pub fn entries(&self) -> Result<Vec<SkipPoolEntry>> {
        self.load()
    }

    pub fn get(&self, question_id: u32) -> Result<Option<SkipPoolEntry>> {
        Ok(self.load()?.into_iter().find(|e| e.question_id == question_id))
    }

    /// Entries sorted oldest skip first
    pub fn oldest_first(&self) -> Result<Vec<SkipPoolEntry>> {
        let mut entries = self.load()?;
        entries.sort_by_key(|e| e.last_skipped_at);
        Ok(entries)
    }
}
