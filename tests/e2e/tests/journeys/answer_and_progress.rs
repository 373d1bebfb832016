//! Journey: answering and watching progress
//!
//! A user answers questions over several days and checks their streak,
//! categories, quality and the next milestone.

use chrono::{NaiveDate, Utc};
use echoes_core::{EchoesError, Period};
use echoes_e2e_tests::{TestDataFactory, TestJournal, DEFAULT_USER};

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[test]
fn test_streak_counts_through_yesterday_then_today() {
    let t = TestJournal::new_temp();
    let q = t.journal.catalog().questions()[0].clone();
    let days: Vec<NaiveDate> = [1, 2, 3, 6]
        .iter()
        .map(|n| TestDataFactory::day_before(today(), *n))
        .collect();
    TestDataFactory::seed_days(&t.storage, DEFAULT_USER, &q, &days);

    let report = t.journal.stats(DEFAULT_USER, today()).unwrap();
    assert_eq!(report.stats.total_reflections, 4);
    assert_eq!(report.stats.current_streak, 3);
    assert_eq!(report.stats.longest_streak, 3);
    assert!(report.delta.is_none());

    t.journal
        .answer(DEFAULT_USER, today(), Period::Morning, "Today counts too", vec![])
        .unwrap();

    let report = t.journal.stats(DEFAULT_USER, today()).unwrap();
    assert_eq!(report.stats.total_reflections, 5);
    assert_eq!(report.stats.current_streak, 4);
    assert_eq!(report.stats.longest_streak, 4);

    let delta = report.delta.expect("previous snapshot exists");
    assert_eq!(delta.reflections, 1);
    assert_eq!(delta.current_streak, 1);
}

#[test]
fn test_gap_before_yesterday_breaks_streak() {
    let t = TestJournal::new_temp();
    let q = t.journal.catalog().questions()[0].clone();
    let days = [
        TestDataFactory::day_before(today(), 2),
        TestDataFactory::day_before(today(), 3),
    ];
    TestDataFactory::seed_days(&t.storage, DEFAULT_USER, &q, &days);

    let report = t.journal.stats(DEFAULT_USER, today()).unwrap();
    assert_eq!(report.stats.current_streak, 0);
    assert_eq!(report.stats.longest_streak, 2);
}

#[test]
fn test_categories_completion_and_milestone() {
    let t = TestJournal::new_temp();
    let catalog = t.journal.catalog().clone();

    let mut categories: Vec<String> = catalog.categories().keys().map(|c| c.to_string()).collect();
    categories.truncate(3);
    for category in &categories {
        let q = catalog
            .questions()
            .iter()
            .find(|q| &q.category == category)
            .unwrap();
        t.journal
            .answer_question(DEFAULT_USER, q.id, "Something I remember well", vec![])
            .unwrap();
    }

    let stats = t.journal.stats(DEFAULT_USER, today()).unwrap().stats;
    assert_eq!(stats.total_reflections, 3);
    assert_eq!(stats.categories_covered.len(), 3);
    assert!((stats.completion_percentage - 0.12).abs() < 1e-9);

    let milestone = stats.next_milestone.expect("first milestone ahead");
    assert_eq!(milestone.threshold, 50);
    assert_eq!(milestone.remaining, 47);
}

#[test]
fn test_deeper_answers_score_higher() {
    let t = TestJournal::new_temp();

    let shallow = t
        .journal
        .answer_question(DEFAULT_USER, 1, TestDataFactory::shallow_answer(), vec![])
        .unwrap()
        .reflection;
    let deep = t
        .journal
        .answer_question(DEFAULT_USER, 2, &TestDataFactory::deep_answer(), vec![])
        .unwrap()
        .reflection;

    assert_eq!(shallow.word_count, 3);
    assert!(deep.word_count > 100);
    assert!(deep.quality_score > shallow.quality_score);
    assert!(deep.quality_score <= 1.0);
    assert!(shallow.quality_score >= 0.1);

    // Stored values match what was returned
    let stored = t.storage_reflection(&deep.id);
    assert_eq!(stored.word_count, deep.word_count);
    assert!((stored.quality_score - deep.quality_score).abs() < 1e-9);
}

#[test]
fn test_edit_recomputes_quality() {
    let t = TestJournal::new_temp();
    let saved = t
        .journal
        .answer_question(DEFAULT_USER, 4, TestDataFactory::shallow_answer(), vec![])
        .unwrap()
        .reflection;

    let updated = t
        .journal
        .update(DEFAULT_USER, &saved.id, &TestDataFactory::deep_answer())
        .unwrap();
    assert!(updated.word_count > saved.word_count);
    assert!(updated.quality_score > saved.quality_score);
}

#[test]
fn test_answered_question_is_held_back_from_new_days() {
    let t = TestJournal::new_temp();
    let pair = t.journal.today(DEFAULT_USER, today()).unwrap();
    t.journal
        .answer(DEFAULT_USER, today(), Period::Morning, "Morning thoughts", vec![])
        .unwrap();

    for offset in 1..=7 {
        let later = today() + chrono::Duration::days(offset);
        let next = t.journal.today(DEFAULT_USER, later).unwrap();
        assert_ne!(next.morning.id, pair.morning.id);
        assert_ne!(next.afternoon.id, pair.morning.id);
    }
}

#[test]
fn test_delete_removes_from_stats() {
    let t = TestJournal::new_temp();
    let saved = t
        .journal
        .answer_question(DEFAULT_USER, 9, "To be removed", vec![])
        .unwrap()
        .reflection;
    assert_eq!(t.stored_reflections(DEFAULT_USER), 1);

    assert!(t.journal.delete(DEFAULT_USER, &saved.id).unwrap());
    assert_eq!(t.stored_reflections(DEFAULT_USER), 0);
    assert_eq!(t.journal.stats(DEFAULT_USER, today()).unwrap().stats.total_reflections, 0);
}

#[test]
fn test_blank_answer_is_rejected() {
    let t = TestJournal::new_temp();
    let err = t
        .journal
        .answer(DEFAULT_USER, today(), Period::Afternoon, "  \n ", vec![])
        .unwrap_err();
    assert!(matches!(err, EchoesError::EmptyReflection));
    assert_eq!(t.stored_reflections(DEFAULT_USER), 0);
}
