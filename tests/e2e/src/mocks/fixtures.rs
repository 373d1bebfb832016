//! Test Data Factory
//!
//! Provides utilities for generating realistic test data:
//! - Reflections at chosen timestamps
//! - Day runs for streak scenarios
//! - Answers of varying depth for quality checks

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use echoes_core::{NewReflection, Question, Reflection, ReflectionStore, Storage};

pub const DEFAULT_USER: &str = "someone@example.com";

/// Factory for creating test data
///
/// # Example
///
/// ```rust,ignore
/// let q = &catalog.questions()[0];
/// TestDataFactory::seed_days(&storage, DEFAULT_USER, q, &[d1, d2, d3]);
/// ```
pub struct TestDataFactory;

impl TestDataFactory {
    /// Noon UTC on the given day
    pub fn noon(day: NaiveDate) -> DateTime<Utc> {
        Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).expect("valid time"))
    }

    /// A materialized reflection answering `question` at `at`
    pub fn reflection(user: &str, question: &Question, text: &str, at: DateTime<Utc>) -> Reflection {
        NewReflection {
            user: user.to_string(),
            question_id: question.id,
            category: question.category.clone(),
            response_text: text.to_string(),
            tags: vec![],
        }
        .into_reflection(format!("seed-{}-{}", question.id, at.timestamp()), at)
    }

    /// Store one reflection per day, all at noon
    pub fn seed_days(
        storage: &Storage,
        user: &str,
        question: &Question,
        days: &[NaiveDate],
    ) -> Vec<Reflection> {
        days.iter()
            .map(|day| {
                let r = Self::reflection(user, question, "A short note", Self::noon(*day));
                storage.import_reflection(&r).expect("seed reflection")
            })
            .collect()
    }

    /// Short, shallow answer
    pub fn shallow_answer() -> &'static str {
        "It was fine."
    }

    /// Long answer with depth keywords and personal phrases
    pub fn deep_answer() -> String {
        let mut text = String::from(
            "I remember my grandmother's kitchen because it taught me patience. \
             I feel that I realized, although slowly, what she meant. ",
        );
        text.push_str(&"We baked bread every Sunday and talked about everything. ".repeat(12));
        text
    }

    /// `n` days before `day`
    pub fn day_before(day: NaiveDate, n: i64) -> NaiveDate {
        day - chrono::Duration::days(n)
    }
}
