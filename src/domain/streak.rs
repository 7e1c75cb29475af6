//! Account-level streak tracking
//!
//! This module defines the aggregate Streak: unlike a habit's own streak it is
//! scoped by type (currently only "daily_completion") and advances once per day
//! on which the day's overall completion condition was met.

use serde::{Deserialize, Serialize};

use crate::domain::{DateKey, UserId};

/// Which condition a streak counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakType {
    /// Every active habit completed that day
    DailyCompletion,
}

impl StreakType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreakType::DailyCompletion => "daily_completion",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "daily_completion" => Some(StreakType::DailyCompletion),
            _ => None,
        }
    }
}

/// Calculated streak information for one user and streak type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Streak {
    pub user_id: UserId,
    pub streak_type: StreakType,
    /// Consecutive qualifying days ending today or yesterday
    pub current_streak: u32,
    /// Best run ever; never decreases
    pub longest_streak: u32,
    pub last_active_date: Option<DateKey>,
}

impl Streak {
    /// Create an empty streak record
    pub fn new(user_id: UserId, streak_type: StreakType) -> Self {
        Self {
            user_id,
            streak_type,
            current_streak: 0,
            longest_streak: 0,
            last_active_date: None,
        }
    }

    /// Recalculate from the set of qualifying days.
    ///
    /// Days after `today` are ignored. The current streak is zero once a full
    /// day has been missed. `previous_longest` keeps the best run monotone even
    /// if older entries are no longer in `days`.
    pub fn calculate_from_days(
        user_id: UserId,
        streak_type: StreakType,
        days: &[DateKey],
        today: DateKey,
        previous_longest: u32,
    ) -> Self {
        let mut sorted: Vec<DateKey> = days.iter().copied().filter(|d| *d <= today).collect();
        sorted.sort();
        sorted.dedup();

        let last_active_date = sorted.last().copied();
        let current_streak = Self::calculate_current_streak(&sorted, today);
        let longest_streak = Self::calculate_longest_streak(&sorted)
            .max(current_streak)
            .max(previous_longest);

        Self {
            user_id,
            streak_type,
            current_streak,
            longest_streak,
            last_active_date,
        }
    }

    /// On track if the last qualifying day is today or yesterday
    pub fn is_on_track(&self, today: DateKey) -> bool {
        match self.last_active_date {
            None => false,
            Some(last) => today.days_since(last) <= 1,
        }
    }

    /// Get a motivational message based on current streak status
    pub fn motivational_message(&self) -> String {
        match self.current_streak {
            0 => "Ready to start your streak! Every journey begins with a single step.".to_string(),
            1 => "Great start! One day down, keep the momentum going.".to_string(),
            2..=6 => format!("Nice work! {} days in a row. You're building a strong habit.", self.current_streak),
            7..=13 => format!("Excellent! {} days strong. You're in the groove now!", self.current_streak),
            14..=29 => format!("Amazing! {} days straight. This is becoming second nature.", self.current_streak),
            30..=99 => format!("Incredible! {} days of consistency. You're a habit master!", self.current_streak),
            _ => format!("Legendary! {} days of unwavering commitment. You're an inspiration!", self.current_streak),
        }
    }

    /// Count back from the most recent day; zero if it is older than yesterday.
    /// `days` must be sorted ascending without duplicates.
    fn calculate_current_streak(days: &[DateKey], today: DateKey) -> u32 {
        let Some(&last) = days.last() else {
            return 0;
        };
        if today.days_since(last) > 1 {
            return 0;
        }

        let mut streak = 1;
        for pair in days.windows(2).rev() {
            if pair[1].days_since(pair[0]) == 1 {
                streak += 1;
            } else {
                break;
            }
        }
        streak
    }

    /// `days` must be sorted ascending without duplicates
    fn calculate_longest_streak(days: &[DateKey]) -> u32 {
        if days.is_empty() {
            return 0;
        }

        let mut longest = 1;
        let mut current = 1;
        for pair in days.windows(2) {
            if pair[1].days_since(pair[0]) == 1 {
                current += 1;
            } else {
                longest = longest.max(current);
                current = 1;
            }
        }
        longest.max(current)
    }
}
