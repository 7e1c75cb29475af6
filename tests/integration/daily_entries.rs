use super::*;
use std::time::{Duration, Instant};

fn habit_row<'a>(listed: &'a Value, id: &str) -> &'a Value {
    listed["habits"]
        .as_array()
        .unwrap()
        .iter()
        .find(|h| h["habit_id"] == id)
        .expect("habit listed")
}

fn entry_habit<'a>(entry: &'a Value, id: &str) -> &'a Value {
    entry["habits"]
        .as_array()
        .unwrap()
        .iter()
        .find(|h| h["habit_id"] == id)
        .expect("habit in entry")
}

/// Progression and journal are separate records; neither updates the other.
#[tokio::test]
async fn test_progress_and_entry_diverge() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let run = h.create_habit("Run", 3, &day).await;
    let read = h.create_habit("Read", 3, &day).await;

    h.call("habit_progress", json!({"habit_id": run, "completed": true}), &day)
        .await;
    let entry = h.call("daily_entry_get", json!({}), &day).await;
    assert_eq!(entry_habit(&entry, &run)["completed"], false);
    assert_eq!(entry["completion_percent"], 0);

    let saved = h
        .call("daily_entry_save", json!({"habit_completions": {read.clone(): true}}), &day)
        .await;
    assert_eq!(entry_habit(&saved, &read)["completed"], true);
    assert_eq!(saved["completion_percent"], 50);

    let listed = h.call("habit_list", json!({}), &day).await;
    assert_eq!(habit_row(&listed, &run)["experience"], 24);
    assert_eq!(habit_row(&listed, &read)["experience"], 0);

    // Undoing progress leaves the journal alone
    h.call("habit_progress", json!({"habit_id": run, "completed": false}), &day)
        .await;
    let entry = h.call("daily_entry_get", json!({}), &day).await;
    assert_eq!(entry_habit(&entry, &read)["completed"], true);
    assert_eq!(entry["state"], "saved");
}

#[tokio::test]
async fn test_auto_finalize_happens_exactly_once() {
    let mut h = harness().await;
    let id = h.create_habit("Run", 3, &ctx("alice", "2024-05-01")).await;

    h.call("daily_entry_save", json!({"notes": "felt good"}), &ctx("alice", "2024-05-01"))
        .await;
    // Saved but without activity
    h.call(
        "daily_entry_save",
        json!({"habit_completions": {id.clone(): false}}),
        &ctx("alice", "2024-05-02"),
    )
    .await;

    let later = ctx("alice", "2024-05-03");
    let first = h.call("habit_list", json!({}), &later).await;
    assert_eq!(first["finalized_entries"], 1);
    let second = h.call("habit_list", json!({}), &later).await;
    assert_eq!(second["finalized_entries"], 0);

    let closed = h.call("daily_entry_get", json!({"date": "2024-05-01"}), &later).await;
    assert_eq!(closed["state"], "finalized");
    assert_eq!(closed["entry"]["auto_finalized"], true);
    assert_eq!(closed["entry"]["notes"], "felt good");

    let open = h.call("daily_entry_get", json!({"date": "2024-05-02"}), &later).await;
    assert_eq!(open["state"], "saved");
    assert_eq!(open["entry"]["auto_finalized"], false);

    let err = h
        .call_err("daily_entry_save", json!({"date": "2024-05-01", "notes": "edit"}), &later)
        .await;
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_manual_finalize_is_idempotent() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    h.create_habit("Run", 3, &day).await;

    let first = h.call("daily_entry_finalize", json!({}), &day).await;
    assert_eq!(first["state"], "finalized");
    assert_eq!(first["entry"]["auto_finalized"], false);

    let second = h.call("daily_entry_finalize", json!({}), &day).await;
    assert_eq!(second["state"], "finalized");
    assert!(second["message"].as_str().unwrap().contains("already finalized"));

    let err = h.call_err("daily_entry_edit", json!({"notes": "late"}), &day).await;
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_debounced_edits_flush_after_quiet_period() {
    let mut h = harness_with(ServerConfig {
        debounce: Duration::from_secs(10),
        ..ServerConfig::default()
    })
    .await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Run", 3, &day).await;

    let edited = h.call("daily_entry_edit", json!({"notes": "draft one"}), &day).await;
    assert_eq!(edited["state"], "draft");
    assert_eq!(edited["flush_after_ms"], 10_000);
    h.call("daily_entry_edit", json!({"habit_completions": {id.clone(): true}}), &day)
        .await;
    assert_eq!(h.server.pending_drafts(), 1);

    // Reads see the draft before it is written
    let shown = h.call("daily_entry_get", json!({}), &day).await;
    assert_eq!(shown["state"], "draft");
    assert_eq!(shown["entry"]["notes"], "draft one");
    assert!(h
        .server
        .storage()
        .find_entry(&day.user_id, day.today)
        .unwrap()
        .is_none());

    assert_eq!(h.server.flush_due_drafts(Instant::now()), 0);
    assert_eq!(h.server.flush_due_drafts(Instant::now() + Duration::from_secs(11)), 1);
    assert_eq!(h.server.pending_drafts(), 0);

    let stored = h
        .server
        .storage()
        .find_entry(&day.user_id, day.today)
        .unwrap()
        .expect("entry written");
    assert_eq!(stored.notes, "draft one");
    assert!(stored.is_habit_complete(&HabitId::from_string(&id).unwrap()));
}

#[tokio::test]
async fn test_explicit_save_includes_pending_draft() {
    let mut h = harness_with(ServerConfig {
        debounce: Duration::from_secs(10),
        ..ServerConfig::default()
    })
    .await;
    let day = ctx("alice", "2024-05-01");
    h.create_habit("Run", 3, &day).await;

    h.call("daily_entry_edit", json!({"notes": "from draft"}), &day).await;
    let saved = h
        .call("daily_entry_save", json!({"punctuality_score": 4}), &day)
        .await;
    assert_eq!(saved["state"], "saved");
    assert_eq!(saved["entry"]["notes"], "from draft");
    assert_eq!(saved["entry"]["punctuality_score"], 4);
    assert_eq!(h.server.pending_drafts(), 0);

    // Nothing left for the timer
    assert_eq!(h.server.flush_due_drafts(Instant::now() + Duration::from_secs(60)), 0);
}

#[tokio::test]
async fn test_draft_that_no_longer_applies_is_dropped() {
    let mut h = harness_with(ServerConfig {
        debounce: Duration::from_secs(10),
        ..ServerConfig::default()
    })
    .await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Run", 3, &day).await;

    h.call("daily_entry_edit", json!({"habit_completions": {id.clone(): true}}), &day)
        .await;
    h.call("habit_delete", json!({"habit_id": id, "confirm": true}), &day).await;

    assert_eq!(h.server.flush_due_drafts(Instant::now() + Duration::from_secs(11)), 0);
    assert_eq!(h.server.pending_drafts(), 0);
}

#[tokio::test]
async fn test_drain_writes_everything_on_shutdown() {
    let mut h = harness_with(ServerConfig {
        debounce: Duration::from_secs(600),
        ..ServerConfig::default()
    })
    .await;
    let alice = ctx("alice", "2024-05-01");
    let bob = ctx("bob", "2024-05-01");
    h.call("daily_entry_edit", json!({"notes": "alice"}), &alice).await;
    h.call("daily_entry_edit", json!({"notes": "bob"}), &bob).await;

    assert_eq!(h.server.drain_drafts(), 2);
    let storage = h.server.storage();
    assert_eq!(storage.find_entry(&alice.user_id, alice.today).unwrap().unwrap().notes, "alice");
    assert_eq!(storage.find_entry(&bob.user_id, bob.today).unwrap().unwrap().notes, "bob");
}

#[tokio::test]
async fn test_edit_rejects_unknown_habit_and_empty_edit() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");

    let stranger = HabitId::new().to_string();
    let err = h
        .call_err("daily_entry_edit", json!({"habit_completions": {stranger: true}}), &day)
        .await;
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h.call_err("daily_entry_edit", json!({}), &day).await;
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.server.pending_drafts(), 0);
}

#[tokio::test]
async fn test_reset_discards_drafts_and_data() {
    let mut h = harness_with(ServerConfig {
        debounce: Duration::from_secs(600),
        ..ServerConfig::default()
    })
    .await;
    let day = ctx("alice", "2024-05-01");
    h.create_habit("Run", 3, &day).await;
    h.call("daily_entry_edit", json!({"notes": "pending"}), &day).await;

    let reset = h.call("user_reset", json!({"confirm": true}), &day).await;
    assert_eq!(reset["discarded_drafts"], 1);
    assert_eq!(h.server.pending_drafts(), 0);
    assert_eq!(h.call("habit_list", json!({}), &day).await["habits"].as_array().unwrap().len(), 0);
}
