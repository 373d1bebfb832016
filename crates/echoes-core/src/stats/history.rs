//! Rolling stats history
//!
//! Keeps the last few snapshots per user so the CLI can say what changed
//! since the previous look.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Stats;
use crate::kv::{self, KeyValueStore, Versioned, SCHEMA_VERSION};
use crate::storage::Result;

/// Snapshots retained per user
pub const HISTORY_LIMIT: usize = 30;

/// The parts of `Stats` worth comparing over time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub recorded_at: DateTime<Utc>,
    pub total_reflections: usize,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub average_quality_score: f64,
    pub categories_covered: usize,
}

impl StatsSnapshot {
    pub fn from_stats(stats: &Stats, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            total_reflections: stats.total_reflections,
            current_streak: stats.current_streak,
            longest_streak: stats.longest_streak,
            average_quality_score: stats.average_quality_score,
            categories_covered: stats.categories_covered.len(),
        }
    }
}

/// Difference between the current stats and the previous snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDelta {
    pub since: DateTime<Utc>,
    pub reflections: i64,
    pub current_streak: i64,
    pub average_quality_score: f64,
    pub categories_covered: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryBlob {
    version: u32,
    snapshots: VecDeque<StatsSnapshot>,
}

impl Versioned for HistoryBlob {
    fn version(&self) -> u32 {
        self.version
    }
}

/// Per-user snapshot log in the key-value store
pub struct StatsHistory<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    key: String,
}

impl<'a, S: KeyValueStore + ?Sized> StatsHistory<'a, S> {
    pub fn new(store: &'a S, user: &str) -> Self {
        Self {
            store,
            key: kv::keys::stats_history(user),
        }
    }

    fn load(&self) -> Result<VecDeque<StatsSnapshot>> {
        Ok(kv::load_json::<HistoryBlob, _>(self.store, &self.key)?
            .map(|b| b.snapshots)
            .unwrap_or_default())
    }

    /// Oldest first
    pub fn snapshots(&self) -> Result<Vec<StatsSnapshot>> {
        Ok(self.load()?.into_iter().collect())
    }

    pub fn latest(&self) -> Result<Option<StatsSnapshot>> {
        Ok(self.load()?.pop_back())
    }

    /// Append a snapshot, dropping the oldest beyond `HISTORY_LIMIT`
    pub fn record(&self, stats: &Stats, at: DateTime<Utc>) -> Result<StatsSnapshot> {
        let mut snapshots = self.load()?;
        let snapshot = StatsSnapshot::from_stats(stats, at);
        snapshots.push_back(snapshot.clone());
        while snapshots.len() > HISTORY_LIMIT {
            snapshots.pop_front();
        }
        kv::save_json(
            self.store,
            &self.key,
            &HistoryBlob {
                version: SCHEMA_VERSION,
                snapshots,
            },
        )?;
        Ok(snapshot)
    }

    /// Compare `stats` against the most recent snapshot
    pub fn change_since_last(&self, stats: &Stats) -> Result<Option<StatsDelta>> {
        Ok(self.latest()?.map(|last| StatsDelta {
            since: last.recorded_at,
            reflections: stats.total_reflections as i64 - last.total_reflections as i64,
            current_streak: stats.current_streak as i64 - last.current_streak as i64,
            average_quality_score: stats.average_quality_score - last.average_quality_score,
            categories_covered: stats.categories_covered.len() as i64
                - last.categories_covered as i64,
        }))
    }
}
