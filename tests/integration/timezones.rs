use super::*;
use chrono::{TimeZone, Utc};
use chrono_tz::Tz;

#[tokio::test]
async fn test_context_resolves_zone_and_user() {
    let h = harness_with(ServerConfig {
        default_user: "owner".to_string(),
        default_timezone: "Asia/Tokyo".to_string(),
        ..ServerConfig::default()
    })
    .await;

    let ctx = h.server.context(Some("alice"), Some("America/Los_Angeles"));
    assert_eq!(ctx.user_id, UserId::new("alice"));
    assert_eq!(ctx.zone, Tz::America__Los_Angeles);

    let fallback = h.server.context(None, Some("Not/AZone"));
    assert_eq!(fallback.user_id, UserId::new("owner"));
    assert_eq!(fallback.zone, Tz::Asia__Tokyo);

    let blank = h.server.context(Some("   "), None);
    assert_eq!(blank.user_id, UserId::new("owner"));
}

#[tokio::test]
async fn test_completion_lands_on_the_callers_local_day() {
    let mut h = harness().await;
    // 00:00 UTC is still the previous evening in Los Angeles
    let instant = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    let pacific = RequestContext::at(UserId::new("alice"), Tz::America__Los_Angeles, instant);
    let utc = RequestContext::at(UserId::new("bob"), Tz::UTC, instant);
    assert_eq!(pacific.today.to_string(), "2024-01-14");
    assert_eq!(utc.today.to_string(), "2024-01-15");

    let alice_habit = h.create_habit("Run", 3, &pacific).await;
    let bob_habit = h.create_habit("Run", 3, &utc).await;

    let alice = h
        .call("habit_progress", json!({"habit_id": alice_habit, "completed": true}), &pacific)
        .await;
    let bob = h
        .call("habit_progress", json!({"habit_id": bob_habit, "completed": true}), &utc)
        .await;
    assert_eq!(alice["habit"]["progress"]["last_completed"], "2024-01-14");
    assert_eq!(bob["habit"]["progress"]["last_completed"], "2024-01-15");

    let entry = h.call("daily_entry_get", json!({}), &pacific).await;
    assert_eq!(entry["date"], "2024-01-14");
}

#[tokio::test]
async fn test_malformed_dates_are_rejected() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    let id = h.create_habit("Run", 3, &day).await;

    for bad in ["2024-5-1", "05/01/2024", "2024-02-30", ""] {
        let err = h
            .call_err("habit_progress", json!({"habit_id": id, "completed": true, "date": bad}), &day)
            .await;
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", bad);

        let err = h.call_err("daily_entry_get", json!({"date": bad}), &day).await;
        assert_eq!(err.kind(), ErrorKind::Validation, "{}", bad);
    }
}
