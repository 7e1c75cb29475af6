/// Tool for wiping a user's data
///
/// This module implements the user_reset MCP tool.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::engine::DraftBuffer;
use crate::storage::HabitStorage;
use crate::tools::{RequestContext, ToolError};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ResetParams {
    /// Must be true; every habit, entry, goal and message of the user is deleted
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub discarded_drafts: usize,
    pub message: String,
}

pub fn reset_user<S: HabitStorage>(
    storage: &S,
    drafts: &mut DraftBuffer,
    ctx: &RequestContext,
    params: ResetParams,
) -> Result<ResetResponse, ToolError> {
    if !params.confirm {
        return Err(ToolError::ConfirmationRequired { action: "reset all data" });
    }

    let discarded_drafts = drafts.discard_user(&ctx.user_id);
    storage.reset_user_data(&ctx.user_id)?;
    tracing::info!("Reset all data for {}", ctx.user_id);

    Ok(ResetResponse {
        success: true,
        discarded_drafts,
        message: "🧹 All your habits, entries, goals and chat history were deleted. Fresh start!".to_string(),
    })
}
