/// MCP tools for habit management
///
/// This module contains all the MCP tools that external clients can call to
/// interact with the tracker. Every tool is a plain function over a
/// `HabitStorage` and the caller's `RequestContext`; the ones that talk to the
/// assistant are async.

pub mod chat;
pub mod create;
pub mod entries;
pub mod goals;
pub mod insights;
pub mod list;
pub mod progress;
pub mod reset;
pub mod subtasks;
pub mod update;

// Re-export tool functions for easy access
pub use chat::*;
pub use create::*;
pub use entries::*;
pub use goals::*;
pub use insights::*;
pub use list::*;
pub use progress::*;
pub use reset::*;
pub use subtasks::*;
pub use update::*;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::analytics::{AnalyticsEngine, UserProgress};
use crate::domain::{
    Achievement, DateKey, DomainError, HabitId, Streak, StreakType, SubtaskId, Tag, Tier,
    UserId,
};
use crate::engine::reconciler::auto_finalize;
use crate::engine::timezone::today_key_at;
use crate::engine::ProgressionOutcome;
use crate::storage::{HabitStorage, StorageError};

/// Errors surfaced by tools, classified for the transport
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Refusing to {action} without confirm: true")]
    ConfirmationRequired { action: &'static str },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Failed to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Coarse error taxonomy the boundary maps onto transport codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    StaleReversal,
    StorageUnavailable,
    UnknownTool,
    Internal,
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::Domain(DomainError::StaleReversal { .. }) => ErrorKind::StaleReversal,
            ToolError::Domain(_) | ToolError::InvalidParams(_) | ToolError::ConfirmationRequired { .. } => {
                ErrorKind::Validation
            }
            ToolError::Storage(StorageError::HabitNotFound { .. })
            | ToolError::Storage(StorageError::SubtaskNotFound { .. })
            | ToolError::NotFound { .. } => ErrorKind::NotFound,
            ToolError::Storage(_) => ErrorKind::StorageUnavailable,
            ToolError::UnknownTool(_) => ErrorKind::UnknownTool,
            ToolError::Encoding(_) => ErrorKind::Internal,
        }
    }

    /// Whether the same call may succeed later without changes
    pub fn is_retryable(&self) -> bool {
        matches!(self, ToolError::Storage(err) if err.is_retryable())
    }
}

/// Who is calling and what day it is for them
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub user_id: UserId,
    pub zone: Tz,
    pub today: DateKey,
}

impl RequestContext {
    /// Context for a request arriving at `now`
    pub fn at(user_id: UserId, zone: Tz, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            zone,
            today: today_key_at(now, zone),
        }
    }

    /// Context pinned to a given day, regardless of the clock
    pub fn on(user_id: UserId, zone: Tz, today: DateKey) -> Self {
        Self { user_id, zone, today }
    }

    /// Parse an optional `YYYY-MM-DD` parameter, defaulting to today
    pub fn date_or_today(&self, raw: Option<&str>) -> Result<DateKey, ToolError> {
        match raw {
            Some(raw) => Ok(DateKey::parse(raw)?),
            None => Ok(self.today),
        }
    }

    /// Like `date_or_today`, but for writes: a day more than
    /// `FUTURE_GRACE_DAYS` past today is rejected
    pub fn recorded_date(&self, raw: Option<&str>) -> Result<DateKey, ToolError> {
        let date = self.date_or_today(raw)?;
        if date > self.today.add_days(FUTURE_GRACE_DAYS) {
            return Err(ToolError::InvalidParams(format!(
                "{} is in the future (today is {})",
                date, self.today
            )));
        }
        Ok(date)
    }
}

/// Allowance for a client whose zone is ahead of the server's idea of today
pub const FUTURE_GRACE_DAYS: i64 = 1;

pub(crate) fn parse_habit_id(raw: &str) -> Result<HabitId, ToolError> {
    HabitId::from_string(raw).map_err(|_| ToolError::InvalidParams(format!("'{}' is not a valid habit id", raw)))
}

pub(crate) fn parse_subtask_id(raw: &str) -> Result<SubtaskId, ToolError> {
    SubtaskId::from_string(raw)
        .map_err(|_| ToolError::InvalidParams(format!("'{}' is not a valid subtask id", raw)))
}

pub(crate) fn parse_tags(raw: &[String]) -> Result<Vec<Tag>, ToolError> {
    raw.iter().map(|t| Tag::parse(t).map_err(ToolError::from)).collect()
}

/// A tier move reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierChange {
    pub from: Tier,
    pub to: Tier,
    pub promoted: bool,
}

impl TierChange {
    pub fn of(outcome: &ProgressionOutcome) -> Option<Self> {
        outcome.tier_change().map(|(from, to)| TierChange {
            from,
            to,
            promoted: to > from,
        })
    }

    pub fn describe(&self) -> String {
        if self.promoted {
            format!("🏆 Promoted from {} to {}!", self.from, self.to)
        } else {
            format!("⬇️ Dropped from {} to {}.", self.from, self.to)
        }
    }
}

/// An achievement unlocked by the current call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnlockedAchievement {
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Account-wide state recomputed after anything that can move it
#[derive(Debug, Clone, Serialize)]
pub struct AccountSnapshot {
    pub progress: UserProgress,
    pub daily_streak: Streak,
    pub unlocked: Vec<UnlockedAchievement>,
}

/// Rebuild the daily completion streak, persist it and unlock achievements
pub(crate) fn refresh_account<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<AccountSnapshot, ToolError> {
    let analytics = AnalyticsEngine::new();
    let habits = storage.list_habits(&ctx.user_id, false)?;
    let entries = storage.list_all_entries(&ctx.user_id)?;
    let previous_longest = storage
        .find_streak(&ctx.user_id, StreakType::DailyCompletion)?
        .map(|s| s.longest_streak)
        .unwrap_or(0);

    let streak = analytics.daily_streak(&ctx.user_id, &habits, &entries, ctx.today, previous_longest);
    storage.save_streak(&streak)?;

    let metrics = analytics.achievement_metrics(&habits, &entries, &streak);
    let already = storage.list_achievements(&ctx.user_id)?;
    let mut unlocked = Vec::new();
    for def in analytics.newly_unlocked(&metrics, &already) {
        let achievement = Achievement {
            id: def.id.to_string(),
            user_id: ctx.user_id.clone(),
            unlocked_at: Utc::now(),
        };
        if storage.unlock_achievement(&achievement)? {
            tracing::info!("User {} unlocked achievement {}", ctx.user_id, def.id);
            unlocked.push(UnlockedAchievement {
                id: def.id.to_string(),
                title: def.title.to_string(),
                description: def.description.to_string(),
            });
        }
    }

    Ok(AccountSnapshot {
        progress: analytics.user_progress(&habits, Some(&streak)),
        daily_streak: streak,
        unlocked,
    })
}

/// Finalize every open past entry that has activity; returns how many
pub(crate) fn auto_finalize_past<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
) -> Result<u32, ToolError> {
    let mut finalized = 0;
    for mut entry in storage.list_open_entries_before(&ctx.user_id, ctx.today)? {
        if auto_finalize(&mut entry, ctx.today) {
            storage.save_entry(&entry)?;
            finalized += 1;
        }
    }
    if finalized > 0 {
        tracing::info!("Auto-finalized {} past entries for {}", finalized, ctx.user_id);
    }
    Ok(finalized)
}

/// Trailing line listing unlocked achievements, if any
pub(crate) fn unlocked_line(unlocked: &[UnlockedAchievement]) -> String {
    if unlocked.is_empty() {
        return String::new();
    }
    let titles: Vec<&str> = unlocked.iter().map(|a| a.title.as_str()).collect();
    format!("\n🎖️ Achievement unlocked: {}", titles.join(", "))
}
