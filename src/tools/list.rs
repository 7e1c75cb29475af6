/// Tool for listing all habits
///
/// This module implements the habit_list MCP tool. Listing is also when
/// overdue upkeep happens: missed days are penalized and finished past days
/// are finalized before anything is shown.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{Badge, DateKey, Habit, Tag, Tier};
use crate::engine::ProgressionEngine;
use crate::storage::HabitStorage;
use crate::tools::{auto_finalize_past, RequestContext, ToolError};

/// Parameters for listing habits
#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct ListHabitsParams {
    /// Show only active habits (default: true)
    pub active_only: Option<bool>,
    /// Only habits training this attribute (STR, AGI, INT, VIT, PER)
    pub tag: Option<String>,
    /// Sort by: 'order', 'name', 'level', 'streak', 'experience' (default: order)
    pub sort_by: Option<String>,
}

/// Information about a habit in the list
#[derive(Debug, Serialize)]
pub struct HabitSummary {
    pub habit_id: String,
    pub name: String,
    pub emoji: String,
    pub tags: Vec<Tag>,
    pub difficulty_rating: u8,
    pub level: u32,
    pub experience: u64,
    pub experience_to_next: u64,
    pub streak: u32,
    pub longest_streak: u32,
    pub completion_rate: u8,
    pub total_completions: u32,
    pub tier: Tier,
    pub badges: Vec<Badge>,
    pub completed_today: bool,
    pub is_active: bool,
    pub subtask_count: usize,
}

impl HabitSummary {
    fn new(habit: &Habit, today: DateKey, subtask_count: usize) -> Self {
        let p = &habit.progress;
        Self {
            habit_id: habit.id.to_string(),
            name: habit.name.clone(),
            emoji: habit.emoji.clone(),
            tags: habit.tags.clone(),
            difficulty_rating: habit.difficulty_rating,
            level: p.level,
            experience: p.experience,
            experience_to_next: p.experience_to_next,
            streak: p.streak,
            longest_streak: p.longest_streak,
            completion_rate: p.completion_rate,
            total_completions: p.total_completions,
            tier: p.tier,
            badges: p.badges.iter().copied().collect(),
            completed_today: habit.completed_on(today),
            is_active: habit.is_active,
            subtask_count,
        }
    }
}

/// Response from listing habits
#[derive(Debug, Serialize)]
pub struct ListHabitsResponse {
    pub success: bool,
    pub habits: Vec<HabitSummary>,
    /// Habits that lost experience to inactivity during this call
    pub decayed: u32,
    /// Past entries finalized during this call
    pub finalized_entries: u32,
    pub message: String,
}

/// List habits using the provided storage
pub fn list_habits<S: HabitStorage>(
    storage: &S,
    engine: &ProgressionEngine,
    ctx: &RequestContext,
    params: ListHabitsParams,
) -> Result<ListHabitsResponse, ToolError> {
    let finalized_entries = auto_finalize_past(storage, ctx)?;

    let mut decayed = 0;
    let mut habits = Vec::new();
    for habit in storage.list_habits(&ctx.user_id, false)? {
        let outcome = engine.apply_inactivity_decay(&habit, ctx.today);
        if outcome.changed {
            storage.update_habit(&outcome.habit)?;
            if outcome.experience_delta < 0 {
                decayed += 1;
            }
        }
        habits.push(outcome.habit);
    }

    let tag_filter = params.tag.as_deref().map(Tag::parse).transpose()?;
    let active_only = params.active_only.unwrap_or(true);
    habits.retain(|h| (!active_only || h.is_active) && tag_filter.map_or(true, |tag| h.tags.contains(&tag)));

    match params.sort_by.as_deref().unwrap_or("order") {
        "order" => habits.sort_by_key(|h| (h.order, h.created_at)),
        "name" => habits.sort_by_key(|h| h.name.to_lowercase()),
        "level" => habits.sort_by(|a, b| b.progress.level.cmp(&a.progress.level)),
        "streak" => habits.sort_by(|a, b| b.progress.streak.cmp(&a.progress.streak)),
        "experience" => habits.sort_by(|a, b| b.progress.experience.cmp(&a.progress.experience)),
        other => {
            return Err(ToolError::InvalidParams(format!(
                "Invalid sort_by '{}'. Valid options: order, name, level, streak, experience",
                other
            )))
        }
    }

    let subtasks = storage.list_subtasks(&ctx.user_id, None, true)?;
    let summaries: Vec<HabitSummary> = habits
        .iter()
        .map(|h| {
            let count = subtasks.iter().filter(|s| s.habit_id == h.id).count();
            HabitSummary::new(h, ctx.today, count)
        })
        .collect();

    let message = if summaries.is_empty() {
        "No habits found. Create your first habit to get started!".to_string()
    } else {
        let lines = summaries
            .iter()
            .map(|h| {
                format!(
                    "{} **{}** Lv {} ({}/{} XP) | {} | 🔥 {} days | 📊 {}%{}{}",
                    h.emoji,
                    h.name,
                    h.level,
                    h.experience,
                    h.experience_to_next,
                    h.tier,
                    h.streak,
                    h.completion_rate,
                    if h.completed_today { " ✅" } else { "" },
                    if h.is_active { "" } else { " ⏸️ (paused)" }
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("📋 **Habit Summary** ({} habits)\n\n{}", summaries.len(), lines)
    };

    Ok(ListHabitsResponse {
        success: true,
        habits: summaries,
        decayed,
        finalized_entries,
        message,
    })
}
