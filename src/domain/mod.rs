//! Domain module containing core business logic and data types
//!
//! This module defines the core entities (Habit, DailyEntry, Subtask, Streak,
//! Goal, Achievement, ChatMessage) and their validation rules. These types
//! represent the fundamental concepts in the habit tracker; the rules that
//! mutate habit progression live in `crate::engine`.

pub mod achievement;
pub mod badge;
pub mod chat;
pub mod entry;
pub mod goal;
pub mod habit;
pub mod streak;
pub mod subtask;
pub mod types;

// Re-export public types for easy access
pub use achievement::*;
pub use badge::*;
pub use chat::*;
pub use entry::*;
pub use goal::*;
pub use habit::*;
pub use streak::*;
pub use subtask::*;
pub use types::*;

use thiserror::Error;

/// Errors that can occur during domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid habit name: {0}")]
    InvalidHabitName(String),

    #[error("Invalid date key: {0}")]
    InvalidDateKey(String),

    #[error("Invalid value: {message}")]
    InvalidValue { message: String },

    #[error("Completion of habit {habit_id} on {date} can no longer be reversed")]
    StaleReversal { habit_id: String, date: String },

    #[error("Daily entry for {date} is finalized and cannot be changed")]
    EntryFinalized { date: String },

    #[error("Not enough experience to level up: {experience}/{required}")]
    InsufficientExperience { experience: u64, required: u64 },
}
