//! Answered-question cache
//!
//! Per category, which question ids the user has answered and when. This is
//! a local cache of what the reflection store already knows; `rebuild`
//! resyncs it from the server list when the two drift.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::remote::Reflection;
use crate::storage::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AnsweredBlob {
    version: u32,
    categories: BTreeMap<String, BTreeMap<u32, DateTime<Utc>>>,
}

impl Versioned for AnsweredBlob {
    fn version(&self) -> u32 {
        self.version
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnsweredSet {
    categories: BTreeMap<String, BTreeMap<u32, DateTime<Utc>>>,
}

impl AnsweredSet {
    pub fn load<S: KeyValueStore + ?Sized>(store: &S, user: &str) -> Result<Self> {
        let blob = kv::load_json::<AnsweredBlob, _>(store, &kv::keys::answered(user))?;
        Ok(Self {
            categories: blob.map(|b| b.categories).unwrap_or_default(),
        })
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S, user: &str) -> Result<()> {
        kv::save_json(
            store,
            &kv::keys::answered(user),
            &AnsweredBlob {
                version: SCHEMA_VERSION,
                categories: self.categories.clone(),
            },
        )
    }

    /// Rebuild from the authoritative reflection list.
    ///
    /// The latest answer time wins when a question was answered twice.
    /// Reflections without a timestamp are stamped with the epoch so they
    /// never count as recent.
    pub fn rebuild(reflections: &[Reflection]) -> Self {
        let mut set = Self::default();
        for r in reflections {
            let at = r.created_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
            set.mark(&r.category, r.question_id, at);
        }
        set
    }

    /// Record an answer; keeps the later timestamp on repeats
    pub fn mark(&mut self, category: &str, question_id: u32, at: DateTime<Utc>) {
        let answers = self.categories.entry(category.to_string()).or_default();
        let slot = answers.entry(question_id).or_insert(at);
        if at > *slot {
            *slot = at;
        }
    }

    /// Forget a question in every category, returns whether it was present
    pub fn unmark(&mut self, question_id: u32) -> bool {
        let mut removed = false;
        for answers in self.categories.values_mut() {
            removed |= answers.remove(&question_id).is_some();
        }
        self.categories.retain(|_, answers| !answers.is_empty());
        removed
    }

    pub fn contains(&self, question_id: u32) -> bool {
        self.categories.values().any(|a| a.contains_key(&question_id))
    }

    pub fn ids_in(&self, category: &str) -> Vec<u32> {
        self.categories
            .get(category)
            .map(|a| a.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Ids answered on or after `cutoff` (UTC day)
    pub fn answered_since(&self, cutoff: NaiveDate) -> HashSet<u32> {
        self.categories
            .values()
            .flat_map(|a| a.iter())
            .filter(|(_, at)| at.date_naive() >= cutoff)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(|a| a.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Answered counts per category
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(c, a)| (c.clone(), a.len()))
            .collect()
    }
}
