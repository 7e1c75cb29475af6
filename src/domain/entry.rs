//! DailyEntry entity: one journal row per user per day
//!
//! A daily entry records which habits (and subtasks) were completed on a given
//! date key, two 1-5 self-assessment scores, and free-text notes. Once
//! `is_completed` is set the entry is finalized and no longer editable.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DateKey, DomainError, HabitId, SubtaskId, UserId};

/// Upper bound on the notes field
pub const MAX_NOTES_CHARS: usize = 2000;

/// Map a completion percentage (0-100) onto a 1-5 score.
///
/// Rounds to the nearest quarter: 0% → 1, 25% → 2, 50% → 3, 75% → 4, 100% → 5.
pub fn score_for_percent(percent: u8) -> u8 {
    let percent = percent.min(100);
    (percent + 12) / 25 + 1
}

/// A journal of one day's habit completions and reflection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyEntry {
    pub user_id: UserId,
    pub date: DateKey,
    /// Authoritative completion state used for scoring
    pub habit_completions: BTreeMap<HabitId, bool>,
    pub subtask_completions: BTreeMap<SubtaskId, bool>,
    pub punctuality_score: u8,
    pub adherence_score: u8,
    /// Scores were set by the user rather than derived
    pub manual_scores: bool,
    pub notes: String,
    /// Finalized; terminal
    pub is_completed: bool,
    /// Set when the entry was finalized automatically after its day ended
    pub auto_finalized: bool,
    pub updated_at: DateTime<Utc>,
}

impl DailyEntry {
    /// An empty draft for the given day
    pub fn new(user_id: UserId, date: DateKey) -> Self {
        Self {
            user_id,
            date,
            habit_completions: BTreeMap::new(),
            subtask_completions: BTreeMap::new(),
            punctuality_score: 1,
            adherence_score: 1,
            manual_scores: false,
            notes: String::new(),
            is_completed: false,
            auto_finalized: false,
            updated_at: Utc::now(),
        }
    }

    /// Whether anything was recorded: notes or at least one completion
    pub fn has_activity(&self) -> bool {
        !self.notes.trim().is_empty() || self.habit_completions.values().any(|done| *done)
    }

    pub fn is_habit_complete(&self, habit_id: &HabitId) -> bool {
        self.habit_completions.get(habit_id).copied().unwrap_or(false)
    }

    /// Share of the given habits marked complete, 0-100
    pub fn completion_percent(&self, habit_ids: &[HabitId]) -> u8 {
        if habit_ids.is_empty() {
            return 0;
        }
        let done = habit_ids.iter().filter(|id| self.is_habit_complete(id)).count();
        ((done * 100 + habit_ids.len() / 2) / habit_ids.len()) as u8
    }

    /// Whether every one of the given habits is complete (and there is at least one)
    pub fn is_perfect(&self, habit_ids: &[HabitId]) -> bool {
        !habit_ids.is_empty() && habit_ids.iter().all(|id| self.is_habit_complete(id))
    }

    /// Drop completion keys for habits that no longer exist
    pub fn retain_habits(&mut self, known: &HashSet<HabitId>) {
        self.habit_completions.retain(|id, _| known.contains(id));
    }

    /// Override both scores by hand
    pub fn set_scores(&mut self, punctuality: u8, adherence: u8) -> Result<(), DomainError> {
        Self::validate_score("punctuality", punctuality)?;
        Self::validate_score("adherence", adherence)?;
        self.punctuality_score = punctuality;
        self.adherence_score = adherence;
        self.manual_scores = true;
        Ok(())
    }

    /// Recompute both scores from the completion percentage unless overridden
    pub fn derive_scores(&mut self, habit_ids: &[HabitId]) {
        if self.manual_scores {
            return;
        }
        let score = score_for_percent(self.completion_percent(habit_ids));
        self.punctuality_score = score;
        self.adherence_score = score;
    }

    pub fn set_notes(&mut self, notes: String) -> Result<(), DomainError> {
        if notes.chars().count() > MAX_NOTES_CHARS {
            return Err(DomainError::InvalidValue {
                message: format!("Notes cannot be longer than {} characters", MAX_NOTES_CHARS),
            });
        }
        self.notes = notes;
        Ok(())
    }

    /// Fail if the entry is locked against edits
    pub fn ensure_editable(&self) -> Result<(), DomainError> {
        if self.is_completed {
            return Err(DomainError::EntryFinalized {
                date: self.date.to_string(),
            });
        }
        Ok(())
    }

    fn validate_score(field: &str, score: u8) -> Result<(), DomainError> {
        if !(1..=5).contains(&score) {
            return Err(DomainError::InvalidValue {
                message: format!("{} score must be between 1 and 5, got {}", field, score),
            });
        }
        Ok(())
    }
}
