//! Account-wide achievements
//!
//! The catalogue is a fixed list of `(id, kind, requirement)` definitions. A
//! user unlocks an achievement by crossing its requirement; unlocking is
//! idempotent and recorded once per user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;

/// What an achievement measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementKind {
    /// Longest run of days on which every active habit was done
    DailyStreak,
    /// Days on which every active habit was done
    PerfectDays,
    /// Days with written notes
    JournalDays,
    /// Days whose entry was finalized
    FinalizedDays,
}

/// Catalogue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AchievementDefinition {
    pub id: &'static str,
    pub kind: AchievementKind,
    pub requirement: u32,
    pub title: &'static str,
    pub description: &'static str,
}

impl AchievementDefinition {
    pub fn is_met(&self, metrics: &AchievementMetrics) -> bool {
        metrics.value(self.kind) >= self.requirement
    }

    pub fn find(id: &str) -> Option<&'static AchievementDefinition> {
        CATALOG.iter().find(|def| def.id == id)
    }
}

pub static CATALOG: &[AchievementDefinition] = &[
    AchievementDefinition {
        id: "streak_3",
        kind: AchievementKind::DailyStreak,
        requirement: 3,
        title: "Warming Up",
        description: "Completed every habit three days in a row.",
    },
    AchievementDefinition {
        id: "streak_7",
        kind: AchievementKind::DailyStreak,
        requirement: 7,
        title: "Full Week",
        description: "Completed every habit for a whole week.",
    },
    AchievementDefinition {
        id: "streak_30",
        kind: AchievementKind::DailyStreak,
        requirement: 30,
        title: "Unbreakable",
        description: "Completed every habit for thirty days straight.",
    },
    AchievementDefinition {
        id: "perfect_day",
        kind: AchievementKind::PerfectDays,
        requirement: 1,
        title: "Perfect Day",
        description: "Completed every habit in a single day.",
    },
    AchievementDefinition {
        id: "perfect_days_10",
        kind: AchievementKind::PerfectDays,
        requirement: 10,
        title: "Perfectionist",
        description: "Had ten perfect days.",
    },
    AchievementDefinition {
        id: "journal_5",
        kind: AchievementKind::JournalDays,
        requirement: 5,
        title: "Reflective",
        description: "Wrote notes on five different days.",
    },
    AchievementDefinition {
        id: "finalized_7",
        kind: AchievementKind::FinalizedDays,
        requirement: 7,
        title: "Closing the Books",
        description: "Finalized seven daily entries.",
    },
];

/// Aggregates achievements are measured against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AchievementMetrics {
    pub longest_daily_streak: u32,
    pub perfect_days: u32,
    pub journal_days: u32,
    pub finalized_days: u32,
}

impl AchievementMetrics {
    pub fn value(&self, kind: AchievementKind) -> u32 {
        match kind {
            AchievementKind::DailyStreak => self.longest_daily_streak,
            AchievementKind::PerfectDays => self.perfect_days,
            AchievementKind::JournalDays => self.journal_days,
            AchievementKind::FinalizedDays => self.finalized_days,
        }
    }
}

/// A user's unlock record for one catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub user_id: UserId,
    pub unlocked_at: DateTime<Utc>,
}
