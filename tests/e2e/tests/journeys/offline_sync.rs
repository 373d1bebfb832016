//! Journey: writing while the store is unreachable
//!
//! Answers written offline are kept locally, show up in the list and in
//! stats, and are pushed once the store is back.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use echoes_core::{
    is_local_id, Period, ReflectionStore, RemoteSettingsSink, SyncDebouncer, SyncReport,
};
use echoes_e2e_tests::{TestJournal, DEFAULT_USER};
use serde_json::json;

#[test]
fn test_offline_answer_is_kept_and_later_pushed() {
    let t = TestJournal::new_temp();
    let today = Utc::now().date_naive();
    let question = t.journal.select(DEFAULT_USER, today, Period::Morning).unwrap();

    t.remote.go_offline();
    let saved = t
        .journal
        .answer(DEFAULT_USER, today, Period::Morning, "Written on a plane", vec!["travel".into()])
        .unwrap();
    assert!(!saved.synced);
    assert!(is_local_id(&saved.reflection.id));
    assert_eq!(t.stored_reflections(DEFAULT_USER), 0);

    // Visible locally while offline
    let listed = t.journal.reflections(DEFAULT_USER).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].question_id, question.id);
    let stats = t.journal.stats(DEFAULT_USER, today).unwrap().stats;
    assert_eq!(stats.total_reflections, 1);
    assert_eq!(stats.current_streak, 1);

    // Still offline: nothing is lost
    assert_eq!(
        t.journal.sync_pending(DEFAULT_USER).unwrap(),
        SyncReport { pushed: 0, remaining: 1 }
    );

    t.remote.go_online();
    assert_eq!(
        t.journal.sync_pending(DEFAULT_USER).unwrap(),
        SyncReport { pushed: 1, remaining: 0 }
    );
    assert_eq!(t.stored_reflections(DEFAULT_USER), 1);

    let listed = t.journal.reflections(DEFAULT_USER).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(!is_local_id(&listed[0].id));
    assert_eq!(listed[0].created_at, saved.reflection.created_at);
    assert_eq!(listed[0].tags, vec!["travel".to_string()]);

    // Nothing left to push
    assert_eq!(t.journal.sync_pending(DEFAULT_USER).unwrap(), SyncReport::default());
}

#[test]
fn test_pending_survives_restart() {
    let t = TestJournal::new_temp();
    t.remote.go_offline();
    t.journal
        .answer_question(DEFAULT_USER, 12, "Saved before the crash", vec![])
        .unwrap();

    let t = t.reopen();
    let listed = t.journal.reflections(DEFAULT_USER).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_local());
}

#[test]
fn test_delete_local_answer_while_offline() {
    let t = TestJournal::new_temp();
    t.remote.go_offline();
    let saved = t
        .journal
        .answer_question(DEFAULT_USER, 5, "Changed my mind", vec![])
        .unwrap();

    assert!(t.journal.delete(DEFAULT_USER, &saved.reflection.id).unwrap());
    assert!(t.journal.reflections(DEFAULT_USER).unwrap().is_empty());

    t.remote.go_online();
    assert_eq!(t.journal.sync_pending(DEFAULT_USER).unwrap(), SyncReport::default());
    assert_eq!(t.stored_reflections(DEFAULT_USER), 0);
}

#[test]
fn test_offline_list_falls_back_to_local() {
    let t = TestJournal::new_temp();
    t.journal
        .answer_question(DEFAULT_USER, 1, "Stored while online", vec![])
        .unwrap();

    t.remote.go_offline();
    t.journal
        .answer_question(DEFAULT_USER, 2, "Stored while offline", vec![])
        .unwrap();

    let listed = t.journal.reflections(DEFAULT_USER).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].question_id, 2);
    assert!(t.remote.failed_calls() >= 2);
}

#[test]
fn test_settings_follow_last_write() {
    let t = TestJournal::new_temp();

    t.remote.go_offline();
    t.journal.set_setting(DEFAULT_USER, "reminder", json!("08:00")).unwrap();
    let offline = t.journal.settings(DEFAULT_USER).unwrap();
    assert_eq!(offline.get("reminder"), Some(&json!("08:00")));
    assert!(t.storage.read_settings(DEFAULT_USER).unwrap().is_none());

    t.remote.go_online();
    let synced = t.journal.settings(DEFAULT_USER).unwrap();
    assert_eq!(synced.get("reminder"), Some(&json!("08:00")));
    let stored = t.storage.read_settings(DEFAULT_USER).unwrap().expect("pushed");
    assert_eq!(stored.get("reminder"), Some(&json!("08:00")));
}

#[tokio::test]
async fn test_debounced_settings_write_lands_once_quiet() {
    let t = TestJournal::new_temp();
    let sink = Arc::new(RemoteSettingsSink::new(Arc::clone(&t.remote)));
    let debouncer = SyncDebouncer::new(sink, Duration::from_millis(50));

    for hour in ["06:00", "07:00", "08:00"] {
        let blob = t.journal.set_setting(DEFAULT_USER, "reminder", json!(hour)).unwrap();
        debouncer.schedule(DEFAULT_USER, serde_json::to_value(&blob).unwrap());
    }
    assert_eq!(debouncer.pending_count(), 1);
    assert!(t.storage.read_settings(DEFAULT_USER).unwrap().is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(debouncer.pending_count(), 0);
    let stored = t.storage.read_settings(DEFAULT_USER).unwrap().expect("written");
    assert_eq!(stored.get("reminder"), Some(&json!("08:00")));
}
