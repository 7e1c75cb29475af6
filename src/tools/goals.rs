/// Tools for attribute goals
///
/// This module implements goal_create and goal_progress.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analytics::{AnalyticsEngine, GoalProgress};
use crate::domain::{Goal, GoalPeriod, Tag};
use crate::storage::HabitStorage;
use crate::tools::{RequestContext, ToolError};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateGoalParams {
    /// Attribute to train: STR, AGI, INT, VIT or PER
    pub tag: String,
    /// 'daily', 'weekly' or 'monthly'
    pub period: String,
    /// Completions of habits with this tag wanted per period (1-1000)
    pub target_count: u32,
}

#[derive(Debug, Serialize)]
pub struct CreateGoalResponse {
    pub success: bool,
    pub goal: Goal,
    pub message: String,
}

pub fn create_goal<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    params: CreateGoalParams,
) -> Result<CreateGoalResponse, ToolError> {
    let tag = Tag::parse(&params.tag)?;
    let period = GoalPeriod::parse(&params.period)?;
    let goal = Goal::new(ctx.user_id.clone(), tag, period, params.target_count)?;
    storage.create_goal(&goal)?;

    Ok(CreateGoalResponse {
        success: true,
        message: format!(
            "🎯 Goal set: {} {} completions {}.",
            goal.target_count,
            goal.tag,
            match goal.period {
                GoalPeriod::Daily => "every day",
                GoalPeriod::Weekly => "every week",
                GoalPeriod::Monthly => "every month",
            }
        ),
        goal,
    })
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct GoalProgressParams {}

#[derive(Debug, Serialize)]
pub struct GoalProgressResponse {
    pub success: bool,
    pub goals: Vec<GoalProgress>,
    pub message: String,
}

/// Measure every goal against its rolling window ending today
pub fn goal_progress<S: HabitStorage>(
    storage: &S,
    ctx: &RequestContext,
    _params: GoalProgressParams,
) -> Result<GoalProgressResponse, ToolError> {
    let goals = storage.list_goals(&ctx.user_id)?;
    let longest_window = goals.iter().map(|g| g.period.window_days()).max().unwrap_or(1);
    let habits = storage.list_habits(&ctx.user_id, false)?;
    let entries = storage.list_entries(&ctx.user_id, ctx.today.add_days(1 - longest_window), ctx.today)?;

    let analytics = AnalyticsEngine::new();
    let progress: Vec<GoalProgress> = goals
        .iter()
        .map(|goal| analytics.goal_progress(goal, &habits, &entries, ctx.today))
        .collect();

    let message = if progress.is_empty() {
        "No goals yet. Set one with goal_create to aim an attribute at a target.".to_string()
    } else {
        progress
            .iter()
            .map(|p| {
                format!(
                    "{} {} {}: {}/{} ({}%)",
                    if p.met { "✅" } else { "⏳" },
                    p.goal.tag,
                    p.goal.period.as_str(),
                    p.completed,
                    p.goal.target_count,
                    p.percent
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    Ok(GoalProgressResponse {
        success: true,
        goals: progress,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DailyEntry, DateKey, Habit, UserId};
    use crate::storage::SqliteStorage;
    use chrono_tz::Tz;

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    #[test]
    fn test_weekly_goal_counts_window() {
        let storage = SqliteStorage::in_memory().unwrap();
        let ctx = RequestContext::on(UserId::new("u1"), Tz::UTC, key("2024-05-10"));
        let lift =
            Habit::new(ctx.user_id.clone(), "Lift".to_string(), None, vec![Tag::Str], None, key("2024-05-01")).unwrap();
        storage.create_habit(&lift).unwrap();
        for day in ["2024-05-03", "2024-05-04", "2024-05-09", "2024-05-10"] {
            let mut entry = DailyEntry::new(ctx.user_id.clone(), key(day));
            entry.habit_completions.insert(lift.id, true);
            storage.save_entry(&entry).unwrap();
        }

        let params = CreateGoalParams {
            tag: "str".to_string(),
            period: "weekly".to_string(),
            target_count: 3,
        };
        create_goal(&storage, &ctx, params).unwrap();

        let response = goal_progress(&storage, &ctx, GoalProgressParams::default()).unwrap();
        // 05-04 through 05-10
        assert_eq!(response.goals[0].completed, 3);
        assert!(response.goals[0].met);
        assert_eq!(response.goals[0].percent, 100);
    }

    #[test]
    fn test_create_goal_validation() {
        let storage = SqliteStorage::in_memory().unwrap();
        let ctx = RequestContext::on(UserId::new("u1"), Tz::UTC, key("2024-05-10"));
        let bad_period = CreateGoalParams {
            tag: "STR".to_string(),
            period: "yearly".to_string(),
            target_count: 3,
        };
        assert!(create_goal(&storage, &ctx, bad_period).is_err());
        let bad_target = CreateGoalParams {
            tag: "STR".to_string(),
            period: "daily".to_string(),
            target_count: 0,
        };
        assert!(create_goal(&storage, &ctx, bad_target).is_err());
    }
}
