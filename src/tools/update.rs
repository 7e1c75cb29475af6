/// Tools for changing and removing existing habits
///
/// This module implements habit_update, habit_delete and habit_analyze.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ai::{Assistant, DifficultyAssessment};
use crate::domain::Habit;
use crate::engine::ProgressionEngine;
use crate::storage::HabitStorage;
use crate::tools::{parse_habit_id, parse_tags, RequestContext, TierChange, ToolError};

/// Parameters for updating a habit; absent fields are left alone
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct UpdateHabitParams {
    pub habit_id: String,
    pub name: Option<String>,
    pub emoji: Option<String>,
    /// Replaces the tag list when present
    pub tags: Option<Vec<String>>,
    /// Display rank, lower first
    pub order: Option<i32>,
    /// Pause (false) or resume (true) the habit
    pub is_active: Option<bool>,
    /// New difficulty 1-5; rescales the experience needed for the current level
    pub difficulty_rating: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct UpdateHabitResponse {
    pub success: bool,
    pub habit: Habit,
    pub tier_change: Option<TierChange>,
    pub message: String,
}

pub fn update_habit<S: HabitStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    ctx: &RequestContext,
    params: UpdateHabitParams,
) -> Result<UpdateHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let mut habit = storage.get_habit(&ctx.user_id, &habit_id)?;
    let tags = params.tags.as_deref().map(parse_tags).transpose()?;

    habit.update(params.name, params.emoji, tags, params.order, params.is_active)?;

    let mut tier_change = None;
    if let Some(rating) = params.difficulty_rating {
        let outcome = engine.rerate_difficulty(&habit, rating);
        tier_change = TierChange::of(&outcome);
        habit = outcome.habit;
    }

    storage.update_habit(&habit)?;
    tracing::debug!("Updated habit {}", habit.id);

    let mut message = format!("✏️ Updated {} '{}'.", habit.emoji, habit.name);
    if let Some(change) = &tier_change {
        message.push(' ');
        message.push_str(&change.describe());
    }
    if !habit.is_active {
        message.push_str(" ⏸️ (paused)");
    }

    Ok(UpdateHabitResponse {
        success: true,
        habit,
        tier_change,
        message,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DeleteHabitParams {
    pub habit_id: String,
    /// Must be true; deleting a habit also deletes its subtasks
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteHabitResponse {
    pub success: bool,
    pub habit_id: String,
    pub message: String,
}

pub fn delete_habit<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: DeleteHabitParams,
) -> Result<DeleteHabitResponse, ToolError> {
    if !params.confirm {
        return Err(ToolError::ConfirmationRequired { action: "delete a habit" });
    }
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&ctx.user_id, &habit_id)?;

    storage.delete_habit(&ctx.user_id, &habit_id)?;
    tracing::info!("Deleted habit {} for {}", habit_id, ctx.user_id);

    Ok(DeleteHabitResponse {
        success: true,
        habit_id: habit_id.to_string(),
        message: format!("🗑️ Deleted {} '{}' and its subtasks.", habit.emoji, habit.name),
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct AnalyzeHabitParams {
    pub habit_id: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeHabitResponse {
    pub success: bool,
    pub habit: Habit,
    pub assessment: DifficultyAssessment,
    pub tier_change: Option<TierChange>,
    pub message: String,
}

/// Ask the assistant how hard a habit is and adopt its rating
pub async fn analyze_habit<S: HabitStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    assistant: &Assistant,
    ctx: &RequestContext,
    params: AnalyzeHabitParams,
) -> Result<AnalyzeHabitResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&ctx.user_id, &habit_id)?;
    let steps: Vec<String> = storage
        .list_subtasks(&ctx.user_id, Some(&habit_id), true)?
        .into_iter()
        .map(|s| s.title)
        .collect();

    let assessment = assistant.rate_difficulty(&habit.name, &steps).await;
    let previous_rating = habit.difficulty_rating;
    let outcome = engine.rerate_difficulty(&habit, assessment.rating);
    let tier_change = TierChange::of(&outcome);

    let mut habit = outcome.habit;
    habit.ai_analysis = Some(assessment.analysis.clone());
    habit.last_analyzed = Some(Utc::now());
    storage.update_habit(&habit)?;

    let mut message = if previous_rating == habit.difficulty_rating {
        format!("🔍 {} '{}' stays at difficulty {}/5.", habit.emoji, habit.name, habit.difficulty_rating)
    } else {
        format!(
            "🔍 {} '{}' re-rated from {}/5 to {}/5; {} XP now needed for level {}.",
            habit.emoji,
            habit.name,
            previous_rating,
            habit.difficulty_rating,
            habit.progress.experience_to_next,
            habit.progress.level + 1
        )
    };
    if let Some(change) = &tier_change {
        message.push(' ');
        message.push_str(&change.describe());
    }

    Ok(AnalyzeHabitResponse {
        success: true,
        habit,
        assessment,
        tier_change,
        message,
    })
}
