//! Tier and badge evaluation
//!
//! A tier is the highest row of `TIER_TABLE` whose every minimum is met.
//! Rows are not cumulative; each lists its own full requirement set and all
//! comparisons are inclusive.

use serde::Serialize;

use crate::domain::{Badge, Progression, Tier};
use crate::engine::difficulty::clamp_rating;

/// Minimums for sitting at one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierRequirement {
    pub tier: Tier,
    pub min_level: u32,
    pub min_completion_rate: u8,
    pub min_consistency: u8,
    pub min_longest_streak: u32,
    pub min_difficulty: u8,
}

pub const TIER_TABLE: [TierRequirement; 5] = [
    TierRequirement { tier: Tier::Bronze, min_level: 1, min_completion_rate: 0, min_consistency: 0, min_longest_streak: 0, min_difficulty: 0 },
    TierRequirement { tier: Tier::Silver, min_level: 3, min_completion_rate: 35, min_consistency: 20, min_longest_streak: 3, min_difficulty: 1 },
    TierRequirement { tier: Tier::Gold, min_level: 6, min_completion_rate: 50, min_consistency: 30, min_longest_streak: 7, min_difficulty: 2 },
    TierRequirement { tier: Tier::Platinum, min_level: 10, min_completion_rate: 60, min_consistency: 40, min_longest_streak: 14, min_difficulty: 3 },
    TierRequirement { tier: Tier::Diamond, min_level: 15, min_completion_rate: 70, min_consistency: 50, min_longest_streak: 21, min_difficulty: 4 },
];

/// Statistics a tier is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierInputs {
    pub level: u32,
    pub completion_rate: u8,
    /// `min(100, 100 * longest_streak / max(1, total_completions))`
    pub consistency: u8,
    pub longest_streak: u32,
    pub difficulty: u8,
    pub total_completions: u32,
}

impl TierInputs {
    pub fn from_progress(progress: &Progression, difficulty_rating: u8) -> Self {
        Self {
            level: progress.level,
            completion_rate: progress.completion_rate,
            consistency: progress.consistency(),
            longest_streak: progress.longest_streak,
            difficulty: clamp_rating(difficulty_rating),
            total_completions: progress.total_completions,
        }
    }
}

impl TierRequirement {
    pub fn is_met(&self, inputs: &TierInputs) -> bool {
        inputs.level >= self.min_level
            && inputs.completion_rate >= self.min_completion_rate
            && inputs.consistency >= self.min_consistency
            && self.streak_gate_met(inputs)
            && inputs.difficulty >= self.min_difficulty
    }

    /// Departs from the table: the streak minimum is waived while
    /// `total_completions` is below it, which makes the completion count a
    /// sixth input. A streak can't be longer than the number of completions,
    /// so until then the consistency minimum stands in for the streak minimum.
    fn streak_gate_met(&self, inputs: &TierInputs) -> bool {
        inputs.longest_streak >= self.min_longest_streak
            || inputs.total_completions < self.min_longest_streak
    }
}

/// Highest tier whose full requirement set is met
pub fn evaluate(inputs: &TierInputs) -> Tier {
    TIER_TABLE
        .iter()
        .rev()
        .find(|row| row.is_met(inputs))
        .map(|row| row.tier)
        .unwrap_or(Tier::Bronze)
}

/// Union every newly crossed badge into the progression; returns the new ones
pub fn award_badges(progress: &mut Progression) -> Vec<Badge> {
    let earned: Vec<Badge> = Badge::ALL
        .into_iter()
        .filter(|badge| !progress.badges.contains(badge) && badge.is_earned(progress))
        .collect();
    progress.badges.extend(earned.iter().copied());
    earned
}
