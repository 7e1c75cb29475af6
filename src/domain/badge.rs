//! Badge registry
//!
//! Every badge a habit can earn is a variant here, carrying its own threshold
//! predicate and display metadata. The tier evaluator walks `Badge::ALL` after
//! each progression update instead of checking badge ids one by one.

use serde::{Deserialize, Serialize};

use crate::domain::Progression;

/// One-shot achievements earned by a single habit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstCompletion,
    WeekWarrior,
    MonthMaster,
    TenCompletions,
    FiftyCompletions,
    HundredCompletions,
    LevelFive,
    LevelTen,
}

impl Badge {
    pub const ALL: [Badge; 8] = [
        Badge::FirstCompletion,
        Badge::WeekWarrior,
        Badge::MonthMaster,
        Badge::TenCompletions,
        Badge::FiftyCompletions,
        Badge::HundredCompletions,
        Badge::LevelFive,
        Badge::LevelTen,
    ];

    /// Stable identifier, also the serialized form
    pub fn id(&self) -> &'static str {
        match self {
            Badge::FirstCompletion => "first_completion",
            Badge::WeekWarrior => "week_warrior",
            Badge::MonthMaster => "month_master",
            Badge::TenCompletions => "ten_completions",
            Badge::FiftyCompletions => "fifty_completions",
            Badge::HundredCompletions => "hundred_completions",
            Badge::LevelFive => "level_five",
            Badge::LevelTen => "level_ten",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Badge::FirstCompletion => "First Step",
            Badge::WeekWarrior => "Week Warrior",
            Badge::MonthMaster => "Month Master",
            Badge::TenCompletions => "Getting Serious",
            Badge::FiftyCompletions => "Half Century",
            Badge::HundredCompletions => "Centurion",
            Badge::LevelFive => "Rising Star",
            Badge::LevelTen => "Veteran",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Badge::FirstCompletion => "Completed this habit for the first time.",
            Badge::WeekWarrior => "Kept a 7-day streak.",
            Badge::MonthMaster => "Kept a 30-day streak.",
            Badge::TenCompletions => "Completed this habit 10 times.",
            Badge::FiftyCompletions => "Completed this habit 50 times.",
            Badge::HundredCompletions => "Completed this habit 100 times.",
            Badge::LevelFive => "Reached level 5.",
            Badge::LevelTen => "Reached level 10.",
        }
    }

    /// Whether the given progression state crosses this badge's threshold
    pub fn is_earned(&self, progress: &Progression) -> bool {
        match self {
            Badge::FirstCompletion => progress.total_completions >= 1,
            Badge::WeekWarrior => progress.streak >= 7,
            Badge::MonthMaster => progress.streak >= 30,
            Badge::TenCompletions => progress.total_completions >= 10,
            Badge::FiftyCompletions => progress.total_completions >= 50,
            Badge::HundredCompletions => progress.total_completions >= 100,
            Badge::LevelFive => progress.level >= 5,
            Badge::LevelTen => progress.level >= 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_match_serde_names() {
        for badge in Badge::ALL {
            let json = serde_json::to_string(&badge).unwrap();
            assert_eq!(json, format!("\"{}\"", badge.id()));
        }
    }

    #[test]
    fn test_streak_badges_follow_streak() {
        let mut progress = Progression::starting(100);
        progress.streak = 6;
        assert!(!Badge::WeekWarrior.is_earned(&progress));
        progress.streak = 7;
        assert!(Badge::WeekWarrior.is_earned(&progress));
        assert!(!Badge::MonthMaster.is_earned(&progress));
    }
}
