/// Tools for reflection and ideas
///
/// This module implements the weekly_review and habit_suggestions MCP tools.
/// Both ask the assistant first and fall back to rule-based output, so they
/// never fail because a model is unreachable.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ai::{Assistant, GeneratedText, HabitSuggestion};
use crate::analytics::{AnalyticsEngine, UserProgress, WeeklyReview};
use crate::domain::{Streak, CATALOG};
use crate::storage::HabitStorage;
use crate::tools::{refresh_account, unlocked_line, RequestContext, ToolError, UnlockedAchievement};

/// Most suggestions returned in one call
const MAX_SUGGESTIONS: u8 = 10;

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct WeeklyReviewParams {
    /// Last day of the week as YYYY-MM-DD (default: today)
    pub end_date: Option<String>,
}

/// Catalogue entry with the caller's unlock state
#[derive(Debug, Serialize)]
pub struct AchievementStatus {
    pub id: String,
    pub title: String,
    pub description: String,
    pub unlocked: bool,
}

#[derive(Debug, Serialize)]
pub struct WeeklyReviewResponse {
    pub success: bool,
    pub review: WeeklyReview,
    pub insights: GeneratedText,
    pub daily_streak: Streak,
    pub motivation: String,
    pub user_progress: UserProgress,
    pub achievements: Vec<AchievementStatus>,
    pub unlocked_achievements: Vec<UnlockedAchievement>,
    pub message: String,
}

pub async fn weekly_review<S: HabitStorage>(
    storage: &S,
    assistant: &Assistant,
    ctx: &RequestContext,
    params: WeeklyReviewParams,
) -> Result<WeeklyReviewResponse, ToolError> {
    let end = ctx.date_or_today(params.end_date.as_deref())?;
    let analytics = AnalyticsEngine::new();

    let habits = storage.list_habits(&ctx.user_id, false)?;
    let entries = storage.list_entries(&ctx.user_id, end.add_days(-6), end)?;
    let review = analytics.weekly_review(&habits, &entries, end);

    let insights = assistant
        .weekly_insights(&review, analytics.generate_insights(&review))
        .await;
    let account = refresh_account(storage, ctx)?;
    let motivation = assistant.motivation(&account.daily_streak).await;

    let unlocked_ids: Vec<String> = storage
        .list_achievements(&ctx.user_id)?
        .into_iter()
        .map(|a| a.id)
        .collect();
    let achievements = CATALOG
        .iter()
        .map(|def| AchievementStatus {
            id: def.id.to_string(),
            title: def.title.to_string(),
            description: def.description.to_string(),
            unlocked: unlocked_ids.iter().any(|id| id == def.id),
        })
        .collect();

    let message = format!(
        "📊 **Week of {} to {}**\n{}\n\n🔥 {}{}",
        review.start,
        review.end,
        insights
            .lines
            .iter()
            .map(|line| format!("• {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        motivation,
        unlocked_line(&account.unlocked)
    );

    Ok(WeeklyReviewResponse {
        success: true,
        review,
        insights,
        daily_streak: account.daily_streak,
        motivation,
        user_progress: account.progress,
        achievements,
        unlocked_achievements: account.unlocked,
        message,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct SuggestionsParams {
    /// How many ideas to return (1-10, default 3)
    pub count: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub success: bool,
    pub suggestions: Vec<HabitSuggestion>,
    pub message: String,
}

pub async fn habit_suggestions<S: HabitStorage>(
    storage: &S,
    assistant: &Assistant,
    ctx: &RequestContext,
    params: SuggestionsParams,
) -> Result<SuggestionsResponse, ToolError> {
    let count = params.count.unwrap_or(3).clamp(1, MAX_SUGGESTIONS);
    let existing: Vec<String> = storage
        .list_habits(&ctx.user_id, false)?
        .into_iter()
        .map(|h| h.name)
        .collect();

    let suggestions = assistant.suggest_habits(&existing, usize::from(count)).await;
    let message = format!(
        "💡 Ideas to try:\n{}",
        suggestions
            .iter()
            .map(|s| format!("{} {} (difficulty {}/5)", s.emoji, s.name, s.difficulty_rating))
            .collect::<Vec<_>>()
            .join("\n")
    );

    Ok(SuggestionsResponse {
        success: true,
        suggestions,
        message,
    })
}
