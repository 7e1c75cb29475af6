/// Tools for a habit's checklist
///
/// This module implements subtask_add and subtask_remove. Removal is soft so
/// completion keys recorded in past entries keep pointing at something.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::Subtask;
use crate::storage::{HabitStorage, StorageError};
use crate::tools::{parse_habit_id, parse_subtask_id, RequestContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct AddSubtaskParams {
    pub habit_id: String,
    /// Checklist item text (1-100 characters)
    pub title: String,
    /// Position in the checklist (default: after the last item)
    pub order: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SubtaskResponse {
    pub success: bool,
    pub subtask: Subtask,
    pub message: String,
}

pub fn add_subtask<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: AddSubtaskParams,
) -> Result<SubtaskResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&ctx.user_id, &habit_id)?;
    let existing = storage.list_subtasks(&ctx.user_id, Some(&habit_id), true)?;
    let order = params
        .order
        .unwrap_or_else(|| existing.iter().map(|s| s.order + 1).max().unwrap_or(0));

    let subtask = Subtask::new(ctx.user_id.clone(), habit_id, params.title, order)?;
    storage.create_subtask(&subtask)?;

    Ok(SubtaskResponse {
        success: true,
        message: format!(
            "☑️ Added '{}' to {} '{}' ({} step{}).",
            subtask.title,
            habit.emoji,
            habit.name,
            existing.len() + 1,
            if existing.is_empty() { "" } else { "s" }
        ),
        subtask,
    })
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct RemoveSubtaskParams {
    pub subtask_id: String,
}

pub fn remove_subtask<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: RemoveSubtaskParams,
) -> Result<SubtaskResponse, ToolError> {
    let subtask_id = parse_subtask_id(&params.subtask_id)?;
    let mut subtask = storage
        .find_subtask(&ctx.user_id, &subtask_id)?
        .ok_or_else(|| StorageError::SubtaskNotFound {
            subtask_id: subtask_id.to_string(),
        })?;

    subtask.is_active = false;
    storage.update_subtask(&subtask)?;

    Ok(SubtaskResponse {
        success: true,
        message: format!("➖ Removed '{}' from the checklist.", subtask.title),
        subtask,
    })
}
