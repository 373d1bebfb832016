//! Writing streaks
//!
//! Days are UTC calendar days of `created_at`. Both walks step one day at a
//! time over a sorted set of distinct days.

use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use crate::remote::Reflection;

/// Distinct days with at least one reflection.
///
/// Reflections without a usable timestamp are left out (and logged); the
/// caller still counts them in totals.
pub fn active_days(reflections: &[Reflection]) -> BTreeSet<NaiveDate> {
    let mut days = BTreeSet::new();
    for r in reflections {
        match r.created_day() {
            Some(day) => {
                days.insert(day);
            }
            None => {
                tracing::warn!(reflection = %r.id, "Skipping reflection without timestamp in streak");
            }
        }
    }
    days
}

/// Consecutive active days ending today.
///
/// If nothing has been written yet today the streak is still alive when
/// yesterday was active, and is counted back from yesterday.
pub fn current_streak(days: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let yesterday = today - Duration::days(1);
    let mut cursor = if days.contains(&today) {
        today
    } else if days.contains(&yesterday) {
        yesterday
    } else {
        return 0;
    };

    let mut streak = 0;
    while days.contains(&cursor) {
        streak += 1;
        cursor -= Duration::days(1);
    }
    streak
}

/// Longest run of consecutive active days anywhere in the history
pub fn longest_streak(days: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &day in days {
        run = match previous {
            Some(p) if day - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(day);
    }
    longest
}
