/// Tools for checking habits off and spending experience
///
/// This module implements habit_progress and habit_level_up. The daily entry
/// is written separately by the entry tools; the two are not kept in lockstep.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::UserProgress;
use crate::domain::{Badge, Habit};
use crate::engine::{ProgressionEngine, ProgressionOutcome};
use crate::storage::HabitStorage;
use crate::tools::{
    parse_habit_id, refresh_account, unlocked_line, RequestContext, TierChange, ToolError,
    UnlockedAchievement,
};

/// Parameters for recording a completion change
#[derive(Debug, Deserialize, JsonSchema)]
pub struct HabitProgressParams {
    pub habit_id: String,
    /// true to check the habit off, false to undo today's check
    pub completed: bool,
    /// Day of the completion as YYYY-MM-DD (default: today in the caller's timezone)
    pub date: Option<String>,
}

/// A habit after a progression event, with the account around it
#[derive(Debug, Serialize)]
pub struct HabitProgressResponse {
    pub success: bool,
    pub habit: Habit,
    /// False when the event was a no-op
    pub changed: bool,
    pub experience_delta: i64,
    pub levels_gained: u32,
    pub tier_change: Option<TierChange>,
    pub new_badges: Vec<Badge>,
    pub user_progress: UserProgress,
    pub unlocked_achievements: Vec<UnlockedAchievement>,
    pub message: String,
}

impl HabitProgressResponse {
    fn build<S: HabitStorage>(
        storage: &S,
        ctx: &RequestContext,
        outcome: ProgressionOutcome,
        headline: String,
    ) -> Result<Self, ToolError> {
        let account = refresh_account(storage, ctx)?;
        let tier_change = TierChange::of(&outcome);

        let mut message = headline;
        if outcome.levels_gained > 0 {
            message.push_str(&format!("\n⬆️ Level up! Now level {}.", outcome.habit.progress.level));
        }
        if let Some(change) = &tier_change {
            message.push('\n');
            message.push_str(&change.describe());
        }
        for badge in &outcome.new_badges {
            message.push_str(&format!("\n🏅 Badge earned: {}", badge.title()));
        }
        message.push_str(&unlocked_line(&account.unlocked));

        Ok(Self {
            success: true,
            changed: outcome.changed,
            experience_delta: outcome.experience_delta,
            levels_gained: outcome.levels_gained,
            tier_change,
            new_badges: outcome.new_badges,
            habit: outcome.habit,
            user_progress: account.progress,
            unlocked_achievements: account.unlocked,
            message,
        })
    }
}

/// Check a habit off (or undo the check) and persist the new progression
pub fn record_progress<S: HabitStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    ctx: &RequestContext,
    params: HabitProgressParams,
) -> Result<HabitProgressResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let date = ctx.recorded_date(params.date.as_deref())?;
    let habit = storage.get_habit(&ctx.user_id, &habit_id)?;

    let outcome = engine.apply_completion(&habit, params.completed, date)?;
    if outcome.changed {
        storage.update_habit(&outcome.habit)?;
    }

    let p = &outcome.habit.progress;
    let headline = match (params.completed, outcome.changed) {
        (true, true) => format!(
            "✅ {} '{}' done for {}! +{} XP ({}/{}) | 🔥 {} day streak",
            outcome.habit.emoji,
            outcome.habit.name,
            date,
            outcome.experience_delta,
            p.experience,
            p.experience_to_next,
            p.streak
        ),
        (true, false) => format!(
            "ℹ️ '{}' was already counted for {}; nothing changed.",
            outcome.habit.name, date
        ),
        (false, _) => format!(
            "↩️ Undid {} for '{}'. Back to level {} with {} XP.",
            date, outcome.habit.name, p.level, p.experience
        ),
    };

    HabitProgressResponse::build(storage, ctx, outcome, headline)
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LevelUpParams {
    pub habit_id: String,
}

/// Spend experience that already exceeds the level threshold
pub fn level_up_habit<S: HabitStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    ctx: &RequestContext,
    params: LevelUpParams,
) -> Result<HabitProgressResponse, ToolError> {
    let habit_id = parse_habit_id(&params.habit_id)?;
    let habit = storage.get_habit(&ctx.user_id, &habit_id)?;

    let outcome = engine.level_up(&habit)?;
    storage.update_habit(&outcome.habit)?;

    let headline = format!(
        "🎉 {} '{}' reached level {}!",
        outcome.habit.emoji, outcome.habit.name, outcome.habit.progress.level
    );
    HabitProgressResponse::build(storage, ctx, outcome, headline)
}
