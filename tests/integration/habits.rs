use super::*;

#[tokio::test]
async fn test_progress_then_undo_restores_habit() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Morning run", 3, &day).await;

    let done = h
        .call("habit_progress", json!({"habit_id": id, "completed": true}), &day)
        .await;
    assert_eq!(done["changed"], true);
    assert_eq!(done["experience_delta"], 24);
    assert_eq!(done["habit"]["progress"]["experience"], 24);
    assert_eq!(done["habit"]["progress"]["streak"], 1);
    assert_eq!(done["user_progress"]["total_completions"], 1);

    // Same day again is a no-op
    let again = h
        .call("habit_progress", json!({"habit_id": id, "completed": true}), &day)
        .await;
    assert_eq!(again["changed"], false);
    assert_eq!(again["habit"]["progress"]["experience"], 24);

    let undone = h
        .call("habit_progress", json!({"habit_id": id, "completed": false}), &day)
        .await;
    assert_eq!(undone["experience_delta"], -24);
    assert_eq!(undone["habit"]["progress"]["experience"], 0);
    assert_eq!(undone["habit"]["progress"]["total_completions"], 0);
    assert!(undone["habit"]["progress"]["last_completed"].is_null());

    // Undoing twice is stale
    let err = h
        .call_err("habit_progress", json!({"habit_id": id, "completed": false}), &day)
        .await;
    assert_eq!(err.kind(), ErrorKind::StaleReversal);
}

#[tokio::test]
async fn test_streak_builds_over_days() {
    let mut h = harness().await;
    let id = h.create_habit("Read", 2, &ctx("alice", "2024-05-01")).await;

    for day in ["2024-05-01", "2024-05-02", "2024-05-03"] {
        h.call("habit_progress", json!({"habit_id": id, "completed": true}), &ctx("alice", day))
            .await;
    }
    let listed = h.call("habit_list", json!({}), &ctx("alice", "2024-05-03")).await;
    let habit = &listed["habits"][0];
    assert_eq!(habit["streak"], 3);
    assert_eq!(habit["longest_streak"], 3);
    assert_eq!(habit["total_completions"], 3);
    assert_eq!(habit["completion_rate"], 100);
    assert_eq!(habit["completed_today"], true);
}

#[tokio::test]
async fn test_list_applies_decay_once_per_day() {
    let mut h = harness().await;
    let id = h.create_habit("Stretch", 3, &ctx("alice", "2024-05-01")).await;
    h.call("habit_progress", json!({"habit_id": id, "completed": true}), &ctx("alice", "2024-05-01"))
        .await;

    // 05-02 and 05-03 missed: 2 * 5% of 120
    let later = ctx("alice", "2024-05-04");
    let first = h.call("habit_list", json!({}), &later).await;
    assert_eq!(first["decayed"], 1);
    assert_eq!(first["habits"][0]["experience"], 12);
    assert_eq!(first["habits"][0]["streak"], 0);

    let second = h.call("habit_list", json!({}), &later).await;
    assert_eq!(second["decayed"], 0);
    assert_eq!(second["habits"][0]["experience"], 12);
}

#[tokio::test]
async fn test_users_are_isolated() {
    let mut h = harness().await;
    let alice = ctx("alice", "2024-05-01");
    let bob = ctx("bob", "2024-05-01");
    let id = h.create_habit("Meditate", 2, &alice).await;

    let listed = h.call("habit_list", json!({}), &bob).await;
    assert_eq!(listed["habits"].as_array().unwrap().len(), 0);

    let err = h
        .call_err("habit_progress", json!({"habit_id": id, "completed": true}), &bob)
        .await;
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .call_err("habit_delete", json!({"habit_id": id, "confirm": true}), &bob)
        .await;
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.call("habit_list", json!({}), &alice).await["habits"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_needs_confirmation() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Journal", 1, &day).await;

    let err = h.call_err("habit_delete", json!({"habit_id": id}), &day).await;
    assert_eq!(err.kind(), ErrorKind::Validation);

    h.call("habit_delete", json!({"habit_id": id, "confirm": true}), &day).await;
    let listed = h.call("habit_list", json!({"active_only": false}), &day).await;
    assert_eq!(listed["habits"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_rerating_rescales_threshold() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Swim", 3, &day).await;

    let updated = h
        .call("habit_update", json!({"habit_id": id, "difficulty_rating": 5}), &day)
        .await;
    assert_eq!(updated["habit"]["difficulty_rating"], 5);
    // 100 * 1.6
    assert_eq!(updated["habit"]["progress"]["experience_to_next"], 160);
}

#[tokio::test]
async fn test_level_up_without_enough_experience_fails() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Pushups", 3, &day).await;
    let err = h.call_err("habit_level_up", json!({"habit_id": id}), &day).await;
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Walk", 3, &day).await;
    h.call("habit_progress", json!({"habit_id": id, "completed": true}), &day)
        .await;

    let mut reopened = PushForwardServer::open(h.db_path.clone(), ServerConfig::default())
        .await
        .expect("Failed to reopen server");
    let listed = reopened
        .call_tool("habit_list", json!({}), &day)
        .await
        .expect("habit_list failed");
    assert_eq!(listed["habits"][0]["habit_id"], id.as_str());
    assert_eq!(listed["habits"][0]["experience"], 24);
}

#[tokio::test]
async fn test_subtasks_drive_entry_completion() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Morning routine", 2, &day).await;

    let first = h
        .call("subtask_add", json!({"habit_id": id, "title": "Make bed"}), &day)
        .await;
    let second = h
        .call("subtask_add", json!({"habit_id": id, "title": "Drink water"}), &day)
        .await;
    let first_id = first["subtask"]["id"].as_str().unwrap().to_string();
    let second_id = second["subtask"]["id"].as_str().unwrap().to_string();

    let partial = h
        .call(
            "daily_entry_save",
            json!({"subtask_completions": {first_id.clone(): true}}),
            &day,
        )
        .await;
    assert_eq!(partial["habits"][0]["completed"], false);

    let full = h
        .call(
            "daily_entry_save",
            json!({"subtask_completions": {second_id: true}}),
            &day,
        )
        .await;
    assert_eq!(full["habits"][0]["completed"], true);
    assert_eq!(full["completion_percent"], 100);

    h.call("subtask_remove", json!({"subtask_id": first_id}), &day).await;
    let err = h
        .call_err("subtask_remove", json!({"subtask_id": first_id}), &day)
        .await;
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_goals_and_review_offline() {
    let mut h = harness().await;
    let id = h.create_habit("Deadlift", 4, &ctx("alice", "2024-05-01")).await;
    for day in ["2024-05-05", "2024-05-06", "2024-05-07"] {
        h.call(
            "daily_entry_save",
            json!({"habit_completions": {id.clone(): true}}),
            &ctx("alice", day),
        )
        .await;
    }

    let today = ctx("alice", "2024-05-07");
    h.call("goal_create", json!({"tag": "STR", "period": "weekly", "target_count": 3}), &today)
        .await;
    let goals = h.call("goal_progress", json!({}), &today).await;
    assert_eq!(goals["goals"][0]["completed"], 3);
    assert_eq!(goals["goals"][0]["met"], true);

    let review = h.call("weekly_review", json!({}), &today).await;
    assert_eq!(review["review"]["perfect_days"], 3);
    assert_eq!(review["daily_streak"]["current_streak"], 3);
    assert_eq!(review["insights"]["source"], "heuristic");
}

#[tokio::test]
async fn test_future_completion_is_rejected() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Plank", 2, &day).await;

    let err = h
        .call_err(
            "habit_progress",
            json!({"habit_id": id, "completed": true, "date": "2099-12-31"}),
            &day,
        )
        .await;
    assert_eq!(err.kind(), ErrorKind::Validation);

    // Today still counts afterwards
    let done = h
        .call("habit_progress", json!({"habit_id": id, "completed": true}), &day)
        .await;
    assert_eq!(done["changed"], true);
    assert_eq!(done["habit"]["progress"]["total_completions"], 1);
    assert_eq!(done["habit"]["progress"]["last_completed"], "2024-05-01");

    // A day ahead is tolerated for clients in a later zone
    let tomorrow = h
        .call(
            "habit_progress",
            json!({"habit_id": id, "completed": true, "date": "2024-05-02"}),
            &day,
        )
        .await;
    assert_eq!(tomorrow["changed"], true);

    let err = h
        .call_err("daily_entry_save", json!({"date": "2024-05-09", "notes": "later"}), &day)
        .await;
    assert_eq!(err.kind(), ErrorKind::Validation);
}
