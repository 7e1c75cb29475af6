use super::*;
use pushforward::engine::{evaluate_tier, TierInputs};

fn habit(rating: u8) -> Habit {
    Habit::new(
        UserId::new("u1"),
        "Sprint intervals".to_string(),
        None,
        vec![Tag::Agi],
        Some(rating),
        key("2024-01-01"),
    )
    .expect("valid habit")
}

#[test]
fn test_ninety_plus_twenty_four_levels_up() {
    let engine = ProgressionEngine::default();
    let mut h = habit(3);
    h.progress.experience = 90;
    h.progress.experience_to_next = 100;

    let out = engine.apply_completion(&h, true, key("2024-01-02")).unwrap();
    assert_eq!(out.experience_delta, 24);
    assert_eq!(out.habit.progress.level, 2);
    assert_eq!(out.habit.progress.experience, 14);
    assert_eq!(out.habit.progress.experience_to_next, 144);
}

#[test]
fn test_month_of_daily_completions() {
    let engine = ProgressionEngine::default();
    let mut h = habit(5);
    let mut day = key("2024-01-01");
    let mut earned = std::collections::BTreeSet::new();

    for _ in 0..30 {
        let before = h.progress.clone();
        let out = engine.apply_completion(&h, true, day).unwrap();
        let p = &out.habit.progress;

        assert!(p.level >= 1);
        assert!(p.experience < p.experience_to_next);
        assert!(p.longest_streak >= p.streak);
        assert!(p.total_completions > before.total_completions);
        assert!(p.tier >= before.tier);
        assert!(before.badges.is_subset(&p.badges));
        earned.extend(out.new_badges.iter().copied());

        h = out.habit;
        day = day.next();
    }

    let p = &h.progress;
    assert_eq!(p.streak, 30);
    assert_eq!(p.completion_rate, 100);
    // 30 * 32 xp against 160 + 192 + 230 + 276
    assert_eq!(p.level, 5);
    assert_eq!(p.experience, 102);
    assert_eq!(p.experience_to_next, 331);
    assert_eq!(p.tier, Tier::Silver);
    for badge in [
        Badge::FirstCompletion,
        Badge::WeekWarrior,
        Badge::MonthMaster,
        Badge::TenCompletions,
        Badge::LevelFive,
    ] {
        assert!(p.badges.contains(&badge), "{:?}", badge);
    }
    assert_eq!(&earned, &p.badges);
}

#[test]
fn test_every_completion_can_be_undone_exactly() {
    let engine = ProgressionEngine::default();
    let mut h = habit(4);
    let mut day = key("2024-01-01");

    for step in 0..12 {
        let before = h.clone();
        let done = engine.apply_completion(&h, true, day).unwrap().habit;
        let undone = engine.apply_completion(&done, false, day).unwrap().habit;
        assert_eq!(undone.progress, before.progress, "step {}", step);

        h = done;
        // Skip a day now and then to break the streak
        day = if step % 4 == 3 { day.add_days(2) } else { day.next() };
    }
}

#[test]
fn test_silver_but_not_gold() {
    let mut progress = Progression::starting(100);
    progress.total_completions = 2;
    progress.longest_streak = 1;
    progress.level = 3;
    progress.completion_rate = 35;

    let inputs = TierInputs::from_progress(&progress, 1);
    assert_eq!(inputs.consistency, 50);
    assert_eq!(evaluate_tier(&inputs), Tier::Silver);
}
