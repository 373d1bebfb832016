//! Journey: skipping a question
//!
//! A user rerolls a question they don't feel like answering. It goes into
//! the skip pool, stays out of further rerolls, and later comes back.

use chrono::{Duration, NaiveDate};
use echoes_core::{Period, SelectionConfig};
use echoes_e2e_tests::{TestJournal, DEFAULT_USER};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
}

#[test]
fn test_reroll_swaps_and_records_skip() {
    let t = TestJournal::new_temp();
    let pair = t.journal.today(DEFAULT_USER, day()).unwrap();

    let next = t.journal.reroll(DEFAULT_USER, day(), Period::Morning).unwrap();
    assert_ne!(next.id, pair.morning.id);
    assert_ne!(next.id, pair.afternoon.id);

    let skipped = t.journal.skipped(DEFAULT_USER).unwrap();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].question_id, pair.morning.id);
    assert_eq!(skipped[0].skip_count, 1);

    // The rerolled pick is now the locked one
    let lock = t.journal.lock(DEFAULT_USER, day(), Period::Morning).unwrap().unwrap();
    assert_eq!(lock.question_id, next.id);
    assert!(lock.is_reroll);
    assert_eq!(t.journal.select(DEFAULT_USER, day(), Period::Morning).unwrap().id, next.id);

    // Afternoon untouched
    assert_eq!(
        t.journal.select(DEFAULT_USER, day(), Period::Afternoon).unwrap().id,
        pair.afternoon.id
    );
}

#[test]
fn test_rerolls_avoid_skipped_questions() {
    let t = TestJournal::new_temp();
    let mut seen = vec![t.journal.select(DEFAULT_USER, day(), Period::Afternoon).unwrap().id];

    for _ in 0..10 {
        let next = t.journal.reroll(DEFAULT_USER, day(), Period::Afternoon).unwrap();
        assert!(!seen.contains(&next.id), "rerolled into skipped question {}", next.id);
        seen.push(next.id);
    }

    let pool = t.journal.skipped(DEFAULT_USER).unwrap();
    assert_eq!(pool.len(), 10);
    assert!(pool.iter().all(|e| e.skip_count == 1));
}

#[test]
fn test_reroll_survives_restart() {
    let t = TestJournal::new_temp();
    let next = t.journal.reroll(DEFAULT_USER, day(), Period::Morning).unwrap();

    let t = t.reopen();
    assert_eq!(t.journal.select(DEFAULT_USER, day(), Period::Morning).unwrap().id, next.id);
    assert_eq!(t.journal.skipped(DEFAULT_USER).unwrap().len(), 1);
}

#[test]
fn test_skipped_question_comes_back_and_answer_clears_it() {
    let t = TestJournal::with_config(SelectionConfig {
        skip_priority_probability: 1.0,
        ..SelectionConfig::default()
    });

    let original = t.journal.select(DEFAULT_USER, day(), Period::Morning).unwrap();
    t.journal.reroll(DEFAULT_USER, day(), Period::Morning).unwrap();

    let tomorrow = day() + Duration::days(1);
    let resurfaced = t.journal.select(DEFAULT_USER, tomorrow, Period::Morning).unwrap();
    assert_eq!(resurfaced.id, original.id);
    let lock = t.journal.lock(DEFAULT_USER, tomorrow, Period::Morning).unwrap().unwrap();
    assert!(lock.previously_skipped);

    // The other period never gets the same question
    let afternoon = t.journal.select(DEFAULT_USER, tomorrow, Period::Afternoon).unwrap();
    assert_ne!(afternoon.id, original.id);

    t.journal
        .answer(DEFAULT_USER, tomorrow, Period::Morning, "Finally ready for this one", vec![])
        .unwrap();
    assert!(t.journal.skipped(DEFAULT_USER).unwrap().is_empty());
}

#[test]
fn test_skip_pool_is_per_user() {
    let t = TestJournal::new_temp();
    t.journal.reroll("one@example.com", day(), Period::Morning).unwrap();

    assert_eq!(t.journal.skipped("one@example.com").unwrap().len(), 1);
    assert!(t.journal.skipped("two@example.com").unwrap().is_empty());
}
