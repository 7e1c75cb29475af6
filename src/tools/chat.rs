/// Tool for talking to the habit coach
///
/// This module implements the chat MCP tool. Both sides of the conversation
/// are stored so the next turn has context.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ai::{Assistant, InsightSource};
use crate::analytics::AnalyticsEngine;
use crate::domain::{ChatMessage, ChatRole, StreakType, MAX_MESSAGE_LEN};
use crate::storage::HabitStorage;
use crate::tools::{RequestContext, ToolError};

/// Stored messages fed back as history
const HISTORY_LIMIT: u32 = 20;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ChatParams {
    /// What the user says to the coach
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub reply: String,
    pub source: InsightSource,
    pub message: String,
}

pub async fn chat<S: HabitStorage>(
    storage: &S,
    assistant: &Assistant,
    ctx: &RequestContext,
    params: ChatParams,
) -> Result<ChatResponse, ToolError> {
    let question = ChatMessage::new(ctx.user_id.clone(), ChatRole::User, params.message)?;
    let history = storage.recent_chat_messages(&ctx.user_id, HISTORY_LIMIT)?;

    let habits = storage.list_habits(&ctx.user_id, true)?;
    let streak = storage.find_streak(&ctx.user_id, StreakType::DailyCompletion)?;
    let progress = AnalyticsEngine::new().user_progress(&habits, streak.as_ref());
    let context = format!(
        "{} active habits, {} total completions, average level {:.1}, best tier {}, {} day streak",
        progress.active_habits,
        progress.total_completions,
        progress.average_level,
        progress.highest_tier,
        progress.daily_streak
    );

    let generated = assistant.chat(&history, &question.content, &context).await;
    let mut reply = generated.lines.join("\n");
    if reply.len() > MAX_MESSAGE_LEN {
        let cut = reply
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_MESSAGE_LEN)
            .last()
            .unwrap_or(0);
        reply.truncate(cut);
    }
    let answer = ChatMessage::new(ctx.user_id.clone(), ChatRole::Assistant, reply)?;

    storage.append_chat_message(&question)?;
    storage.append_chat_message(&answer)?;

    Ok(ChatResponse {
        success: true,
        message: format!("💬 {}", answer.content),
        reply: answer.content,
        source: generated.source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateKey, UserId};
    use crate::storage::SqliteStorage;
    use chrono_tz::Tz;

    fn ctx() -> RequestContext {
        RequestContext::on(UserId::new("u1"), Tz::UTC, DateKey::parse("2024-05-01").unwrap())
    }

    #[tokio::test]
    async fn test_chat_stores_both_turns() {
        let storage = SqliteStorage::in_memory().unwrap();
        let params = ChatParams {
            message: "How am I doing?".to_string(),
        };
        let response = chat(&storage, &Assistant::offline(), &ctx(), params).await.unwrap();
        assert_eq!(response.source, InsightSource::Heuristic);
        assert!(response.reply.contains("0 active habits"));

        let history = storage.recent_chat_messages(&ctx().user_id, 10).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let storage = SqliteStorage::in_memory().unwrap();
        let params = ChatParams {
            message: "  ".to_string(),
        };
        assert!(chat(&storage, &Assistant::offline(), &ctx(), params).await.is_err());
        assert!(storage.recent_chat_messages(&ctx().user_id, 10).unwrap().is_empty());
    }
}
