//! Stats Module
//!
//! Progress aggregation over a user's reflections:
//! - Totals, category coverage and averages
//! - Reflection quality heuristic
//! - Current and longest writing streaks
//! - Completion percentage and milestones
//! - Rolling snapshot history

mod history;
mod quality;
mod streak;

pub use history::{StatsDelta, StatsHistory, StatsSnapshot, HISTORY_LIMIT};
pub use quality::{quality_score, word_count, DEPTH_KEYWORDS, PERSONAL_PHRASES};
pub use streak::{active_days, current_streak, longest_streak};

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::remote::Reflection;

/// Reflection count that counts as a complete Echo
pub const COMPLETION_TARGET: usize = 2500;

/// Progress thresholds, ascending
pub const MILESTONES: &[(usize, &str)] = &[
    (50, "First chapter: your Echo has found its voice"),
    (100, "Getting to know you: a hundred moments captured"),
    (250, "Patterns emerge: your values are taking shape"),
    (500, "Deep roots: half a thousand reflections"),
    (1000, "A life in words: one thousand reflections"),
    (1500, "Rich inner world: your Echo speaks with nuance"),
    (2000, "Nearly whole: only the finest details remain"),
    (2500, "Complete Echo: a lasting record of who you are"),
];

/// A progress threshold not yet reached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Milestone {
    pub threshold: usize,
    pub description: String,
    pub remaining: usize,
}

/// Derived progress for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_reflections: usize,
    pub categories_covered: BTreeSet<String>,
    pub average_word_count: f64,
    pub average_quality_score: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub completion_percentage: f64,
    pub next_milestone: Option<Milestone>,
}

/// `min(total / 2500, 1) * 100`
pub fn completion_percentage(total: usize) -> f64 {
    (total as f64 / COMPLETION_TARGET as f64).min(1.0) * 100.0
}

/// First milestone strictly above `total`, `None` once all are met
pub fn next_milestone(total: usize) -> Option<Milestone> {
    MILESTONES
        .iter()
        .find(|(threshold, _)| *threshold > total)
        .map(|(threshold, description)| Milestone {
            threshold: *threshold,
            description: description.to_string(),
            remaining: threshold - total,
        })
}

/// Aggregate a reflection list as of `today`
pub fn compute_stats(reflections: &[Reflection], today: NaiveDate) -> Stats {
    let total = reflections.len();

    let categories_covered: BTreeSet<String> =
        reflections.iter().map(|r| r.category.clone()).collect();

    let (average_word_count, average_quality_score) = if total == 0 {
        (0.0, 0.0)
    } else {
        let words: f64 = reflections.iter().map(|r| r.word_count as f64).sum();
        let quality: f64 = reflections.iter().map(|r| r.quality_score).sum();
        (words / total as f64, quality / total as f64)
    };

    let days = active_days(reflections);

    Stats {
        total_reflections: total,
        categories_covered,
        average_word_count,
        average_quality_score,
        current_streak: current_streak(&days, today),
        longest_streak: longest_streak(&days),
        completion_percentage: completion_percentage(total),
        next_milestone: next_milestone(total),
    }
}
