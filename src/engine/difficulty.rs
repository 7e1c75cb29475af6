//! Difficulty model: experience per completion and the level curve
//!
//! `multiplier = 0.6 + 0.2 * rating`, so rating 1 is worth 0.8x and rating 5
//! is worth 1.6x. The multiplier is kept in tenths and the 1.2 growth factor
//! as 6/5 so thresholds are exact integers, never float-truncated.

use serde::{Deserialize, Serialize};

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
pub const DEFAULT_DIFFICULTY: u8 = 3;

/// Beyond this many growth steps the exact integer form would overflow
const EXACT_GROWTH_STEPS: u32 = 40;

/// Pull any rating into 1-5
pub fn clamp_rating(rating: u8) -> u8 {
    rating.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
}

/// Difficulty multiplier in tenths: rating 1 → 8, rating 5 → 16
pub fn multiplier_tenths(rating: u8) -> u64 {
    6 + 2 * u64::from(clamp_rating(rating))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyModel {
    /// Experience for one completion at multiplier 1.0
    pub base_experience: u64,
    /// Experience needed to leave level 1 at multiplier 1.0
    pub base_threshold: u64,
}

impl Default for DifficultyModel {
    fn default() -> Self {
        Self {
            base_experience: 20,
            base_threshold: 100,
        }
    }
}

impl DifficultyModel {
    /// `floor(base_experience * multiplier)`, always at least 1
    pub fn experience_for_completion(&self, difficulty_rating: u8) -> u64 {
        (self.base_experience * multiplier_tenths(difficulty_rating) / 10).max(1)
    }

    /// `floor(base_threshold * 1.2^(level-1) * multiplier)`, always at least 1.
    ///
    /// Levels below 1 are treated as level 1.
    pub fn experience_required_for_level(&self, level: u32, difficulty_rating: u8) -> u64 {
        let steps = level.max(1) - 1;
        let tenths = multiplier_tenths(difficulty_rating);

        let required = if steps <= EXACT_GROWTH_STEPS {
            let numerator =
                u128::from(self.base_threshold) * 6u128.pow(steps) * u128::from(tenths);
            let denominator = 5u128.pow(steps) * 10;
            u64::try_from(numerator / denominator).unwrap_or(u64::MAX)
        } else {
            // Saturating float path for absurd levels
            let exponent = i32::try_from(steps).unwrap_or(i32::MAX);
            let exact = self.base_threshold as f64 * 1.2f64.powi(exponent) * tenths as f64 / 10.0;
            exact.floor() as u64
        };

        required.max(1)
    }
}
