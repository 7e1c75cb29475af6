//! Habit entity and related functionality
//!
//! This module defines the core Habit struct that represents a recurring
//! behaviour a user wants to build, its validation rules, and the progression
//! block that the engine mutates when the habit is checked off.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Badge, DateKey, DomainError, HabitId, Tag, Tier, UserId};
use crate::engine::difficulty::{clamp_rating, DifficultyModel, DEFAULT_DIFFICULTY};

/// Longest habit name, counted in characters
pub const MAX_NAME_CHARS: usize = 50;
/// A habit trains at most this many attributes
pub const MAX_TAGS: usize = 3;
/// Emoji used when the user doesn't pick one
pub const DEFAULT_EMOJI: &str = "🎯";

/// Gamification state of a habit.
///
/// Only `crate::engine::ProgressionEngine` writes these fields; everything else
/// reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub level: u32,
    pub experience: u64,
    pub experience_to_next: u64,
    /// Consecutive completion days ending at `last_completed`
    pub streak: u32,
    pub longest_streak: u32,
    /// Lifetime completion ratio, 0-100
    pub completion_rate: u8,
    pub total_completions: u32,
    pub tier: Tier,
    pub badges: BTreeSet<Badge>,
    pub last_completed: Option<DateKey>,
    /// Last day an inactivity penalty was applied
    pub last_decay_at: Option<DateKey>,
}

impl Progression {
    /// Level 1 with nothing earned yet
    pub fn starting(experience_to_next: u64) -> Self {
        Self {
            level: 1,
            experience: 0,
            experience_to_next: experience_to_next.max(1),
            streak: 0,
            longest_streak: 0,
            completion_rate: 0,
            total_completions: 0,
            tier: Tier::Bronze,
            badges: BTreeSet::new(),
            last_completed: None,
            last_decay_at: None,
        }
    }

    /// `longest_streak / total_completions` as a 0-100 percentage
    pub fn consistency(&self) -> u8 {
        let ratio = 100 * u64::from(self.longest_streak) / u64::from(self.total_completions.max(1));
        ratio.min(100) as u8
    }
}

/// Ledger record of the most recent completion.
///
/// Holds the progression exactly as it was before the completion so that a
/// same-day un-check can restore it without recomputing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionGrant {
    pub date: DateKey,
    pub experience_granted: u64,
    pub before: Progression,
}

/// A habit represents something the user wants to do every day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    /// Display name (e.g., "Morning Run", "Read 10 pages")
    pub name: String,
    pub emoji: String,
    /// Attributes this habit trains
    pub tags: Vec<Tag>,
    /// Display rank, lower first
    pub order: i32,
    pub is_active: bool,
    /// 1 (trivial) to 5 (very hard)
    pub difficulty_rating: u8,
    pub ai_analysis: Option<String>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Creation day in the creator's timezone; origin of the completion rate
    pub created_on: DateKey,
    pub progress: Progression,
    pub pending_grant: Option<CompletionGrant>,
}

impl Habit {
    /// Create a new habit with validation
    ///
    /// Difficulty ratings outside 1-5 are clamped rather than rejected.
    pub fn new(
        user_id: UserId,
        name: String,
        emoji: Option<String>,
        tags: Vec<Tag>,
        difficulty_rating: Option<u8>,
        created_on: DateKey,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(&name)?;
        let emoji = Self::normalize_emoji(emoji);
        let tags = Self::validate_tags(tags)?;
        let difficulty_rating = clamp_rating(difficulty_rating.unwrap_or(DEFAULT_DIFFICULTY));
        let experience_to_next =
            DifficultyModel::default().experience_required_for_level(1, difficulty_rating);

        Ok(Self {
            id: HabitId::new(),
            user_id,
            name,
            emoji,
            tags,
            order: 0,
            is_active: true,
            difficulty_rating,
            ai_analysis: None,
            last_analyzed: None,
            created_at: Utc::now(),
            created_on,
            progress: Progression::starting(experience_to_next),
            pending_grant: None,
        })
    }

    /// Update the habit's descriptive properties with validation
    ///
    /// Progression and difficulty are not touched here; they go through the
    /// engine.
    pub fn update(
        &mut self,
        name: Option<String>,
        emoji: Option<String>,
        tags: Option<Vec<Tag>>,
        order: Option<i32>,
        is_active: Option<bool>,
    ) -> Result<(), DomainError> {
        // Validate everything before applying anything
        let name = name.map(|n| Self::validate_name(&n)).transpose()?;
        let tags = tags.map(Self::validate_tags).transpose()?;

        if let Some(new_name) = name {
            self.name = new_name;
        }
        if emoji.is_some() {
            self.emoji = Self::normalize_emoji(emoji);
        }
        if let Some(new_tags) = tags {
            self.tags = new_tags;
        }
        if let Some(new_order) = order {
            self.order = new_order;
        }
        if let Some(new_is_active) = is_active {
            self.is_active = new_is_active;
        }

        Ok(())
    }

    /// Whether the habit was checked off on the given day
    pub fn completed_on(&self, date: DateKey) -> bool {
        self.progress.last_completed == Some(date)
    }

    /// Validate and trim a habit name
    fn validate_name(name: &str) -> Result<String, DomainError> {
        let trimmed = name.trim();

        if trimmed.is_empty() {
            return Err(DomainError::InvalidHabitName(
                "Habit name cannot be empty".to_string(),
            ));
        }

        if trimmed.chars().count() > MAX_NAME_CHARS {
            return Err(DomainError::InvalidHabitName(format!(
                "Habit name cannot be longer than {} characters",
                MAX_NAME_CHARS
            )));
        }

        Ok(trimmed.to_string())
    }

    fn normalize_emoji(emoji: Option<String>) -> String {
        emoji
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_EMOJI.to_string())
    }

    /// Deduplicate tags and enforce the tag limit
    fn validate_tags(tags: Vec<Tag>) -> Result<Vec<Tag>, DomainError> {
        let mut unique: Vec<Tag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !unique.contains(&tag) {
                unique.push(tag);
            }
        }

        if unique.len() > MAX_TAGS {
            return Err(DomainError::Validation {
                message: format!("A habit can have at most {} tags", MAX_TAGS),
            });
        }

        Ok(unique)
    }
}
