use super::*;
use pushforward::ai::InsightSource;

#[test]
fn test_offline_suggestions_skip_tracked_habits() {
    let assistant = Assistant::offline();
    let existing = vec!["drink a glass of water".to_string()];
    let ideas = tokio_test::block_on(assistant.suggest_habits(&existing, 3));

    assert_eq!(ideas.len(), 3);
    assert!(ideas.iter().all(|s| s.name != "Drink a glass of water"));
    assert!(ideas.iter().all(|s| (1..=5).contains(&s.difficulty_rating)));
}

#[test]
fn test_offline_rating_uses_heuristic() {
    let assistant = Assistant::offline();
    let steps = vec!["Lace shoes".to_string(), "Warm up".to_string()];
    let rated = tokio_test::block_on(assistant.rate_difficulty("Run 5k", &steps));

    assert_eq!(rated.source, InsightSource::Heuristic);
    assert!((1..=5).contains(&rated.rating));
    assert!(rated.analysis.contains("2 steps"));
}

#[test]
fn test_offline_motivation_matches_streak_message() {
    let assistant = Assistant::offline();
    let mut streak = Streak::new(UserId::new("alice"), StreakType::DailyCompletion);
    streak.current_streak = 8;
    streak.longest_streak = 8;

    let line = tokio_test::block_on(assistant.motivation(&streak));
    assert_eq!(line, streak.motivational_message());
}
