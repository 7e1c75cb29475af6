/// Tool for creating new habits
///
/// This module implements the habit_create MCP tool.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ai::Assistant;
use crate::domain::Habit;
use crate::storage::HabitStorage;
use crate::tools::{parse_tags, RequestContext, ToolError};

/// Parameters for creating a new habit
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct CreateHabitParams {
    /// Habit name (1-50 characters). Omit to adopt the assistant's top suggestion.
    pub name: Option<String>,
    /// Emoji shown next to the habit
    pub emoji: Option<String>,
    /// Up to three attributes: STR, AGI, INT, VIT, PER
    #[serde(default)]
    pub tags: Vec<String>,
    /// Difficulty from 1 (trivial) to 5 (very hard); out of range values are clamped
    pub difficulty_rating: Option<u8>,
    /// Let the assistant rate difficulty when no rating is given
    #[serde(default)]
    pub auto_rate: bool,
}

/// Response from creating a habit
#[derive(Debug, Serialize)]
pub struct CreateHabitResponse {
    pub success: bool,
    pub habit: Habit,
    pub message: String,
}

/// Create a new habit using the provided storage
pub async fn create_habit<S: HabitStorage>(
    storage: &S,
    assistant: &Assistant,
    ctx: &RequestContext,
    params: CreateHabitParams,
) -> Result<CreateHabitResponse, ToolError> {
    let existing = storage.list_habits(&ctx.user_id, false)?;
    let mut tags = parse_tags(&params.tags)?;
    let mut emoji = params.emoji;
    let mut rating = params.difficulty_rating;

    let name = match params.name {
        Some(name) => name,
        None => {
            let names: Vec<String> = existing.iter().map(|h| h.name.clone()).collect();
            let suggestion = assistant
                .suggest_habits(&names, 1)
                .await
                .into_iter()
                .next()
                .ok_or_else(|| ToolError::InvalidParams("name is required".to_string()))?;
            tracing::debug!("Creating suggested habit '{}'", suggestion.name);
            if tags.is_empty() {
                tags = suggestion.tags;
            }
            emoji = emoji.or(Some(suggestion.emoji));
            rating = rating.or(Some(suggestion.difficulty_rating));
            suggestion.name
        }
    };

    let mut analysis = None;
    if rating.is_none() && params.auto_rate {
        let assessment = assistant.rate_difficulty(&name, &[]).await;
        rating = Some(assessment.rating);
        analysis = Some(assessment.analysis);
    }

    let mut habit = Habit::new(ctx.user_id.clone(), name, emoji, tags, rating, ctx.today)?;
    habit.order = existing.iter().map(|h| h.order + 1).max().unwrap_or(0);
    if analysis.is_some() {
        habit.ai_analysis = analysis;
        habit.last_analyzed = Some(Utc::now());
    }

    storage.create_habit(&habit)?;
    tracing::info!("Created habit {} for {}", habit.id, ctx.user_id);

    Ok(CreateHabitResponse {
        success: true,
        message: format!(
            "✅ Created habit {} '{}' (difficulty {}/5)! Ready to start your streak!\nHabit ID: {}",
            habit.emoji, habit.name, habit.difficulty_rating, habit.id
        ),
        habit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DateKey, Tag, UserId, DEFAULT_EMOJI};
    use crate::storage::SqliteStorage;
    use chrono_tz::Tz;

    fn ctx() -> RequestContext {
        RequestContext::on(UserId::new("u1"), Tz::UTC, DateKey::parse("2024-05-01").unwrap())
    }

    #[tokio::test]
    async fn test_create_habit_with_defaults() {
        let storage = SqliteStorage::in_memory().unwrap();
        let params = CreateHabitParams {
            name: Some("Morning Run".to_string()),
            tags: vec!["agi".to_string(), "VIT".to_string()],
            ..Default::default()
        };

        let response = create_habit(&storage, &Assistant::offline(), &ctx(), params).await.unwrap();
        assert!(response.success);
        assert_eq!(response.habit.emoji, DEFAULT_EMOJI);
        assert_eq!(response.habit.tags, vec![Tag::Agi, Tag::Vit]);
        assert_eq!(response.habit.difficulty_rating, 3);
        assert_eq!(response.habit.progress.experience_to_next, 120);
        assert!(storage.find_habit(&ctx().user_id, &response.habit.id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_habit_orders_after_existing() {
        let storage = SqliteStorage::in_memory().unwrap();
        let assistant = Assistant::offline();
        for name in ["One", "Two"] {
            let params = CreateHabitParams {
                name: Some(name.to_string()),
                ..Default::default()
            };
            create_habit(&storage, &assistant, &ctx(), params).await.unwrap();
        }
        let habits = storage.list_habits(&ctx().user_id, false).unwrap();
        assert_eq!(habits.iter().map(|h| h.order).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_create_habit_without_name_uses_suggestion() {
        let storage = SqliteStorage::in_memory().unwrap();
        let response = create_habit(&storage, &Assistant::offline(), &ctx(), CreateHabitParams::default())
            .await
            .unwrap();
        assert_eq!(response.habit.name, "Drink a glass of water");
        assert_eq!(response.habit.difficulty_rating, 1);
    }

    #[tokio::test]
    async fn test_auto_rate_uses_heuristic_offline() {
        let storage = SqliteStorage::in_memory().unwrap();
        let params = CreateHabitParams {
            name: Some("Gym session".to_string()),
            auto_rate: true,
            ..Default::default()
        };
        let response = create_habit(&storage, &Assistant::offline(), &ctx(), params).await.unwrap();
        assert_eq!(response.habit.difficulty_rating, 3);
        assert!(response.habit.ai_analysis.is_some());
    }

    #[tokio::test]
    async fn test_invalid_name_rejected() {
        let storage = SqliteStorage::in_memory().unwrap();
        let params = CreateHabitParams {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        let err = create_habit(&storage, &Assistant::offline(), &ctx(), params).await.unwrap_err();
        assert_eq!(err.kind(), crate::tools::ErrorKind::Validation);
    }
}
