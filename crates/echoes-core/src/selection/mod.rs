//! Selection Module
//!
//! Picks one morning and one afternoon question per user per day:
//! - Seeded by `{user}-{period}-{date}` through a stable string hash
//! - Skips questions answered recently and the other period's pick
//! - Sometimes re-offers the oldest skipped question instead
//! - Locks the pick in the key-value store so it holds all day
//!
//! Rerolls discard the lock, push the old question into the skip pool and
//! draw again from a nonce-salted seed.

mod answered;
mod hash;
mod skip_pool;

pub use answered::AnsweredSet;
pub use hash::seed_hash;
pub use skip_pool::{SkipPool, SkipPoolEntry};

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Question, QuestionCatalog};
use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::storage::Result;

// ============================================================================
// PERIODS
// ============================================================================

/// Half of the day a question belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Morning, Period::Afternoon];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
        }
    }

    /// The opposite half of the day
    pub fn other(&self) -> Period {
        match self {
            Period::Morning => Period::Afternoon,
            Period::Afternoon => Period::Morning,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "morning" | "am" => Ok(Period::Morning),
            "afternoon" | "pm" => Ok(Period::Afternoon),
            _ => Err(format!("Unknown period: {}", s)),
        }
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Selection tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionConfig {
    /// Chance that a fresh pick re-offers the oldest skipped question
    pub skip_priority_probability: f64,
    /// Questions answered within this many days are not offered again
    pub recent_window_days: i64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            skip_priority_probability: 0.3,
            recent_window_days: 14,
        }
    }
}

/// Longest recency window honoured, about a century
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

impl SelectionConfig {
    /// Clamp out-of-range values
    pub fn normalized(mut self) -> Self {
        if !self.skip_priority_probability.is_finite() {
            self.skip_priority_probability = 0.0;
        }
        self.skip_priority_probability = self.skip_priority_probability.clamp(0.0, 1.0);
        self.recent_window_days = self.recent_window_days.clamp(0, MAX_RECENT_WINDOW_DAYS);
        self
    }
}

// ============================================================================
// LOCKS
// ============================================================================

/// The persisted pick for one (user, day, period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockedDailySelection {
    pub version: u32,
    pub period: Period,
    pub date: NaiveDate,
    pub question_id: u32,
    pub selected_at: DateTime<Utc>,
    pub seed: String,
    pub previously_skipped: bool,
    #[serde(default)]
    pub is_reroll: bool,
}

impl Versioned for LockedDailySelection {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Both of a day's questions
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPair {
    pub date: NaiveDate,
    pub morning: Question,
    pub afternoon: Question,
}

// ============================================================================
// SELECTOR
// ============================================================================

/// Daily question selection over a catalog and a key-value store
pub struct DailySelector<'a, S: KeyValueStore + ?Sized> {
    catalog: &'a QuestionCatalog,
    store: &'a S,
    config: SelectionConfig,
}

impl<'a, S: KeyValueStore + ?Sized> DailySelector<'a, S> {
    pub fn new(catalog: &'a QuestionCatalog, store: &'a S, config: SelectionConfig) -> Self {
        Self {
            catalog,
            store,
            config: config.normalized(),
        }
    }

    /// Read the lock for a period without selecting
    pub fn peek(
        &self,
        user: &str,
        date: NaiveDate,
        period: Period,
    ) -> Result<Option<LockedDailySelection>> {
        let lock = kv::load_json::<LockedDailySelection, _>(
            self.store,
            &kv::keys::daily(user, date, period),
        )?;
        Ok(lock.filter(|l| l.date == date && l.period == period))
    }

    /// The question for (user, date, period), selecting and locking it on first call
    pub fn select(&self, user: &str, date: NaiveDate, period: Period) -> Result<Question> {
        if let Some(lock) = self.peek(user, date, period)? {
            match self.catalog.get(lock.question_id) {
                Some(q) => return Ok(q.clone()),
                None => tracing::warn!(
                    question = lock.question_id,
                    %period,
                    "Locked question no longer in catalog, selecting again"
                ),
            }
        }

        let other = self.locked_question(user, date, period.other())?;
        let seed = format!("{}-{}-{}", normalize_user(user), period, date.format("%Y-%m-%d"));
        let hash = seed_hash(&seed);

        let (question, previously_skipped) = match self.prioritized_skip(user, other)? {
            Some(q) => (q, true),
            None => {
                let recent = self.recently_answered(user, date)?;
                let q = self.pick(
                    hash,
                    &[
                        &|q: &Question| !recent.contains(&q.id) && Some(q.id) != other,
                        &|q: &Question| Some(q.id) != other,
                    ],
                );
                (q, false)
            }
        };

        self.write_lock(user, date, period, question.id, seed, previously_skipped, false)?;
        tracing::debug!(
            question = question.id,
            %period,
            %date,
            previously_skipped,
            "Daily question selected"
        );
        Ok(question.clone())
    }

    /// Both periods, morning first
    pub fn today(&self, user: &str, date: NaiveDate) -> Result<DailyPair> {
        let morning = self.select(user, date, Period::Morning)?;
        let afternoon = self.select(user, date, Period::Afternoon)?;
        Ok(DailyPair {
            date,
            morning,
            afternoon,
        })
    }

    /// Swap the period's question for a different one.
    ///
    /// The discarded question goes into the skip pool, and every question in
    /// the pool is kept out of this draw.
    pub fn reroll(&self, user: &str, date: NaiveDate, period: Period) -> Result<Question> {
        let current = self.select(user, date, period)?;
        self.store.delete(&kv::keys::daily(user, date, period))?;

        let pool = SkipPool::new(self.store, user);
        let entry = pool.add(current.id)?;
        let skipped: HashSet<u32> = pool.list()?.into_iter().collect();

        let other = self.locked_question(user, date, period.other())?;
        let recent = self.recently_answered(user, date)?;

        let nonce: u64 = rand::rng().random();
        let seed = format!(
            "{}-{}-{}-reroll-{:016x}",
            normalize_user(user),
            period,
            date.format("%Y-%m-%d"),
            nonce
        );
        let hash = seed_hash(&seed);

        let question = self.pick(
            hash,
            &[
                &|q: &Question| {
                    !skipped.contains(&q.id) && !recent.contains(&q.id) && Some(q.id) != other
                },
                &|q: &Question| !skipped.contains(&q.id) && Some(q.id) != other,
                &|q: &Question| q.id != current.id && Some(q.id) != other,
                &|q: &Question| q.id != current.id,
            ],
        );

        self.write_lock(user, date, period, question.id, seed, false, true)?;
        tracing::info!(
            from = current.id,
            to = question.id,
            %period,
            skip_count = entry.skip_count,
            "Daily question rerolled"
        );
        Ok(question.clone())
    }

    fn locked_question(&self, user: &str, date: NaiveDate, period: Period) -> Result<Option<u32>> {
        Ok(self.peek(user, date, period)?.map(|l| l.question_id))
    }

    fn recently_answered(&self, user: &str, date: NaiveDate) -> Result<HashSet<u32>> {
        let cutoff = Duration::try_days(self.config.recent_window_days)
            .and_then(|window| date.checked_sub_signed(window))
            .unwrap_or(NaiveDate::MIN);
        Ok(AnsweredSet::load(self.store, user)?.answered_since(cutoff))
    }

    /// Oldest skipped question eligible for this period, if the draw says so
    fn prioritized_skip(&self, user: &str, other: Option<u32>) -> Result<Option<&'a Question>> {
        let entries = SkipPool::new(self.store, user).oldest_first()?;
        if entries.is_empty() {
            return Ok(None);
        }
        if !rand::rng().random_bool(self.config.skip_priority_probability) {
            return Ok(None);
        }

        Ok(entries
            .iter()
            .filter(|e| Some(e.question_id) != other)
            .find_map(|e| self.catalog.get(e.question_id)))
    }

    /// First non-empty tier wins; index is `hash % tier.len()`.
    /// Falls back to the whole catalog, which is never empty.
    fn pick(&self, hash: u32, tiers: &[&dyn Fn(&Question) -> bool]) -> &'a Question {
        let questions = self.catalog.questions();
        for tier in tiers {
            let pool: Vec<&Question> = questions.iter().filter(|q| tier(q)).collect();
            if !pool.is_empty() {
                return pool[hash as usize % pool.len()];
            }
        }
        &questions[hash as usize % questions.len()]
    }

    #[allow(clippy::too_many_arguments)]
    fn write_lock(
        &self,
        user: &str,
        date: NaiveDate,
        period: Period,
        question_id: u32,
        seed: String,
        previously_skipped: bool,
        is_reroll: bool,
    ) -> Result<()> {
        let lock = LockedDailySelection {
            version: SCHEMA_VERSION,
            period,
            date,
            question_id,
            selected_at: Utc::now(),
            seed,
            previously_skipped,
            is_reroll,
        };
        kv::save_json(self.store, &kv::keys::daily(user, date, period), &lock)
    }
}

fn normalize_user(user: &str) -> String {
    user.trim().to_lowercase()
}
