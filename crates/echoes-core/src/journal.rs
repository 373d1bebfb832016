//! Journal
//!
//! Ties the catalog, daily selection, local state and the reflection store
//! together into the operations a front end calls.
//!
//! Store failures on write never lose an answer: the reflection is kept in a
//! local pending list under a `local-` id and pushed later by `sync_pending`.
//! Store failures on read fall back to whatever is held locally.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Question, QuestionCatalog};
use crate::error::{EchoesError, Result};
use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::remote::{is_local_id, new_local_id, NewReflection, Reflection, ReflectionStore};
use crate::selection::{
    AnsweredSet, DailyPair, DailySelector, LockedDailySelection, Period, SelectionConfig, SkipPool,
    SkipPoolEntry,
};
use crate::stats::{compute_stats, quality_score, word_count, Stats, StatsDelta, StatsHistory};
use crate::sync::{self, SettingsBlob};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PendingBlob {
    version: u32,
    reflections: Vec<Reflection>,
}

impl Versioned for PendingBlob {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Outcome of saving an answer
#[derive(Debug, Clone, PartialEq)]
pub struct SavedReflection {
    pub reflection: Reflection,
    /// False when the store write failed and the record is local-only
    pub synced: bool,
}

/// Stats plus the change since the previous look
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub stats: Stats,
    pub delta: Option<StatsDelta>,
}

/// Result of pushing local-only records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pushed: usize,
    pub remaining: usize,
}

pub struct Journal<K: KeyValueStore, R: ReflectionStore> {
    catalog: QuestionCatalog,
    store: K,
    remote: R,
    selection: SelectionConfig,
}

impl<K: KeyValueStore, R: ReflectionStore> Journal<K, R> {
    pub fn new(catalog: QuestionCatalog, store: K, remote: R, selection: SelectionConfig) -> Self {
        Self {
            catalog,
            store,
            remote,
            selection,
        }
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    fn selector(&self) -> DailySelector<'_, K> {
        DailySelector::new(&self.catalog, &self.store, self.selection.clone())
    }

    // ========================================================================
    // DAILY QUESTIONS
    // ========================================================================

    pub fn today(&self, user: &str, date: NaiveDate) -> Result<DailyPair> {
        Ok(self.selector().today(user, date)?)
    }

    pub fn select(&self, user: &str, date: NaiveDate, period: Period) -> Result<Question> {
        Ok(self.selector().select(user, date, period)?)
    }

    pub fn lock(
        &self,
        user: &str,
        date: NaiveDate,
        period: Period,
    ) -> Result<Option<LockedDailySelection>> {
        Ok(self.selector().peek(user, date, period)?)
    }

    pub fn reroll(&self, user: &str, date: NaiveDate, period: Period) -> Result<Question> {
        Ok(self.selector().reroll(user, date, period)?)
    }

    /// Skip pool, oldest skip first
    pub fn skipped(&self, user: &str) -> Result<Vec<SkipPoolEntry>> {
        Ok(SkipPool::new(&self.store, user).oldest_first()?)
    }

    // ========================================================================
    // REFLECTIONS
    // ========================================================================

    /// Answer the question locked for (date, period)
    pub fn answer(
        &self,
        user: &str,
        date: NaiveDate,
        period: Period,
        text: &str,
        tags: Vec<String>,
    ) -> Result<SavedReflection> {
        let question = self.select(user, date, period)?;
        self.answer_question(user, question.id, text, tags)
    }

    /// Answer any catalog question
    pub fn answer_question(
        &self,
        user: &str,
        question_id: u32,
        text: &str,
        tags: Vec<String>,
    ) -> Result<SavedReflection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EchoesError::EmptyReflection);
        }
        let question = self
            .catalog
            .get(question_id)
            .ok_or(EchoesError::UnknownQuestion(question_id))?;

        let input = NewReflection {
            user: user.to_string(),
            question_id,
            category: question.category.clone(),
            response_text: text.to_string(),
            tags,
        };

        let saved = match self.remote.create_reflection(input.clone()) {
            Ok(reflection) => SavedReflection {
                reflection,
                synced: true,
            },
            Err(e) => {
                tracing::warn!(error = %e, question = question_id, "Store write failed, keeping reflection locally");
                let reflection = input.into_reflection(new_local_id(), Utc::now());
                let mut pending = self.load_pending(user)?;
                pending.push(reflection.clone());
                self.save_pending(user, pending)?;
                SavedReflection {
                    reflection,
                    synced: false,
                }
            }
        };

        let mut answered = AnsweredSet::load(&self.store, user)?;
        answered.mark(
            &question.category,
            question_id,
            saved.reflection.created_at.unwrap_or_else(Utc::now),
        );
        answered.save(&self.store, user)?;

        if SkipPool::new(&self.store, user).remove(question_id)? {
            tracing::debug!(question = question_id, "Answered question left the skip pool");
        }

        Ok(saved)
    }

    /// Store reflections plus local-only ones, newest first.
    ///
    /// If the store is unreachable only local-only records come back.
    pub fn reflections(&self, user: &str) -> Result<Vec<Reflection>> {
        let mut all = match self.remote.list_reflections(user) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!(error = %e, "Store unavailable, showing local reflections only");
                Vec::new()
            }
        };
        all.extend(self.load_pending(user)?);
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    /// Edit a reflection's text; local-only records are edited in place
    pub fn update(&self, user: &str, id: &str, text: &str) -> Result<Reflection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EchoesError::EmptyReflection);
        }

        if !is_local_id(id) {
            return Ok(self.remote.update_reflection(id, text)?);
        }

        let mut pending = self.load_pending(user)?;
        let record = pending
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| EchoesError::ReflectionNotFound(id.to_string()))?;
        record.response_text = text.to_string();
        record.word_count = word_count(text);
        record.quality_score = quality_score(text, record.word_count);
        let updated = record.clone();
        self.save_pending(user, pending)?;
        Ok(updated)
    }

    /// Delete a reflection, unmarking its question if no other answer remains
    pub fn delete(&self, user: &str, id: &str) -> Result<bool> {
        let question_id = if is_local_id(id) {
            let mut pending = self.load_pending(user)?;
            let Some(pos) = pending.iter().position(|r| r.id == id) else {
                return Ok(false);
            };
            let removed = pending.remove(pos);
            self.save_pending(user, pending)?;
            removed.question_id
        } else {
            let Some(existing) = self.remote.get_reflection(id)? else {
                return Ok(false);
            };
            if !self.remote.delete_reflection(id)? {
                return Ok(false);
            }
            existing.question_id
        };

        // Unmark only against a complete list; a failed read keeps the mark
        let still_answered = match self.remote.list_reflections(user) {
            Ok(stored) => {
                let pending = self.load_pending(user)?;
                stored
                    .iter()
                    .chain(pending.iter())
                    .any(|r| r.question_id == question_id)
            }
            Err(e) => {
                tracing::warn!(error = %e, question = question_id, "Store unreadable after delete, keeping answered mark");
                true
            }
        };
        if !still_answered {
            let mut answered = AnsweredSet::load(&self.store, user)?;
            if answered.unmark(question_id) {
                answered.save(&self.store, user)?;
            }
        }

        tracing::info!(id, question = question_id, "Reflection deleted");
        Ok(true)
    }

    /// Rebuild the answered-set cache from the reflection list
    pub fn resync_answered(&self, user: &str) -> Result<AnsweredSet> {
        let mut all = self.remote.list_reflections(user)?;
        all.extend(self.load_pending(user)?);
        let answered = AnsweredSet::rebuild(&all);
        answered.save(&self.store, user)?;
        tracing::info!(user, answered = answered.len(), "Answered set resynced");
        Ok(answered)
    }

    /// Push local-only reflections to the store. Failures stay pending.
    pub fn sync_pending(&self, user: &str) -> Result<SyncReport> {
        let pending = self.load_pending(user)?;
        if pending.is_empty() {
            return Ok(SyncReport::default());
        }

        let mut remaining = Vec::new();
        let mut pushed = 0;
        for reflection in pending {
            match self.remote.import_reflection(&reflection) {
                Ok(_) => pushed += 1,
                Err(e) => {
                    tracing::warn!(id = %reflection.id, error = %e, "Could not push local reflection");
                    remaining.push(reflection);
                }
            }
        }

        let report = SyncReport {
            pushed,
            remaining: remaining.len(),
        };
        self.save_pending(user, remaining)?;
        Ok(report)
    }

    fn load_pending(&self, user: &str) -> Result<Vec<Reflection>> {
        Ok(kv::load_json::<PendingBlob, _>(&self.store, &kv::keys::pending_reflections(user))?
            .map(|b| b.reflections)
            .unwrap_or_default())
    }

    fn save_pending(&self, user: &str, reflections: Vec<Reflection>) -> Result<()> {
        let key = kv::keys::pending_reflections(user);
        if reflections.is_empty() {
            self.store.delete(&key)?;
            return Ok(());
        }
        kv::save_json(
            &self.store,
            &key,
            &PendingBlob {
                version: SCHEMA_VERSION,
                reflections,
            },
        )?;
        Ok(())
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Current stats, recorded into the rolling history
    pub fn stats(&self, user: &str, today: NaiveDate) -> Result<StatsReport> {
        let reflections = self.reflections(user)?;
        let stats = compute_stats(&reflections, today);

        let history = StatsHistory::new(&self.store, user);
        let delta = history.change_since_last(&stats)?;
        history.record(&stats, Utc::now())?;

        Ok(StatsReport { stats, delta })
    }

    // ========================================================================
    // SETTINGS
    // ========================================================================

    /// Settings reconciled with the store (last write wins)
    pub fn settings(&self, user: &str) -> Result<SettingsBlob> {
        Ok(sync::sync_settings(&self.store, &self.remote, user)?)
    }

    /// Change one setting locally; the caller decides when to push it
    pub fn set_setting(&self, user: &str, key: &str, value: Value) -> Result<SettingsBlob> {
        let mut blob = sync::load_local_settings(&self.store, user)?.unwrap_or_default();
        blob.set(key, value);
        sync::save_local_settings(&self.store, user, &blob)?;
        Ok(blob)
    }
}
