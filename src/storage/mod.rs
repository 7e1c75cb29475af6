//! Storage layer for persisting habit tracker data
//!
//! This module handles all database operations using SQLite. It provides a
//! user-scoped interface for storing and retrieving habits, subtasks, daily
//! entries, streaks, achievements, goals and chat history.

pub mod migrations;
pub mod sqlite;

// Re-export the main storage types
pub use sqlite::*;

use thiserror::Error;

use crate::domain::{
    Achievement, ChatMessage, DailyEntry, DateKey, Goal, Habit, HabitId, Streak, StreakType,
    Subtask, SubtaskId, UserId,
};

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Habit not found: {habit_id}")]
    HabitNotFound { habit_id: String },

    #[error("Subtask not found: {subtask_id}")]
    SubtaskNotFound { subtask_id: String },

    #[error("Migration error: {0}")]
    Migration(String),
}

impl StorageError {
    /// Whether the operation may succeed if simply tried again
    ///
    /// Only a busy or locked database counts. Constraint violations and
    /// unreadable columns fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            StorageError::Connection(_) => true,
            StorageError::Query(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }
}

/// Trait defining the persistence interface.
///
/// Every read and write is scoped by the owning user; a row belonging to
/// another user is indistinguishable from a missing one. Lookups that can
/// legitimately miss return `Option`.
pub trait HabitStorage {
    /// Insert a new habit
    fn create_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    fn find_habit(&self, user_id: &UserId, habit_id: &HabitId) -> Result<Option<Habit>, StorageError>;

    /// Like `find_habit`, but a miss is an error
    fn get_habit(&self, user_id: &UserId, habit_id: &HabitId) -> Result<Habit, StorageError> {
        self.find_habit(user_id, habit_id)?
            .ok_or_else(|| StorageError::HabitNotFound {
                habit_id: habit_id.to_string(),
            })
    }

    /// Overwrite every column of an existing habit
    fn update_habit(&self, habit: &Habit) -> Result<(), StorageError>;

    /// Hard delete; subtasks go with it
    fn delete_habit(&self, user_id: &UserId, habit_id: &HabitId) -> Result<(), StorageError>;

    /// Habits in display order
    fn list_habits(&self, user_id: &UserId, active_only: bool) -> Result<Vec<Habit>, StorageError>;

    fn create_subtask(&self, subtask: &Subtask) -> Result<(), StorageError>;

    fn find_subtask(
        &self,
        user_id: &UserId,
        subtask_id: &SubtaskId,
    ) -> Result<Option<Subtask>, StorageError>;

    fn update_subtask(&self, subtask: &Subtask) -> Result<(), StorageError>;

    /// Subtasks of one habit, or of all the user's habits when `habit_id` is None
    fn list_subtasks(
        &self,
        user_id: &UserId,
        habit_id: Option<&HabitId>,
        active_only: bool,
    ) -> Result<Vec<Subtask>, StorageError>;

    fn find_entry(&self, user_id: &UserId, date: DateKey) -> Result<Option<DailyEntry>, StorageError>;

    /// Insert or replace the entry for (user, date); last write wins
    fn save_entry(&self, entry: &DailyEntry) -> Result<(), StorageError>;

    /// Entries with `start <= date <= end`, oldest first
    fn list_entries(
        &self,
        user_id: &UserId,
        start: DateKey,
        end: DateKey,
    ) -> Result<Vec<DailyEntry>, StorageError>;

    /// Every entry the user has, oldest first
    fn list_all_entries(&self, user_id: &UserId) -> Result<Vec<DailyEntry>, StorageError>;

    /// Entries before `date` that are not finalized yet
    fn list_open_entries_before(
        &self,
        user_id: &UserId,
        date: DateKey,
    ) -> Result<Vec<DailyEntry>, StorageError>;

    fn find_streak(
        &self,
        user_id: &UserId,
        streak_type: StreakType,
    ) -> Result<Option<Streak>, StorageError>;

    fn save_streak(&self, streak: &Streak) -> Result<(), StorageError>;

    /// Record an unlock; returns false if it was already unlocked
    fn unlock_achievement(&self, achievement: &Achievement) -> Result<bool, StorageError>;

    fn list_achievements(&self, user_id: &UserId) -> Result<Vec<Achievement>, StorageError>;

    fn create_goal(&self, goal: &Goal) -> Result<(), StorageError>;

    fn list_goals(&self, user_id: &UserId) -> Result<Vec<Goal>, StorageError>;

    fn append_chat_message(&self, message: &ChatMessage) -> Result<(), StorageError>;

    /// The most recent `limit` messages, oldest first
    fn recent_chat_messages(
        &self,
        user_id: &UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError>;

    /// Delete every row the user owns
    fn reset_user_data(&self, user_id: &UserId) -> Result<(), StorageError>;
}
