//! Analytics engine for aggregate progress and insights
//!
//! This module turns habits and daily entries into the read-side views: the
//! account-wide daily streak, achievement metrics, goal progress and the
//! weekly review. Everything here is computed from data handed in; loading
//! that data is the caller's job.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{
    Achievement, AchievementDefinition, AchievementMetrics, DailyEntry, DateKey, Goal, Habit,
    HabitId, Streak, StreakType, Tag, Tier, UserId, CATALOG,
};

/// Account-level summary returned alongside habit updates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProgress {
    pub total_habits: usize,
    pub active_habits: usize,
    pub total_experience: u64,
    pub average_level: f64,
    pub highest_tier: Tier,
    pub total_completions: u32,
    pub badges_earned: usize,
    pub daily_streak: u32,
    pub longest_daily_streak: u32,
}

/// Completions of one tag measured against a goal's rolling window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: Goal,
    pub window_start: DateKey,
    pub window_end: DateKey,
    pub completed: u32,
    /// 0-100, capped
    pub percent: u8,
    pub met: bool,
}

/// One habit's week at a glance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HabitWeek {
    pub habit_id: HabitId,
    pub name: String,
    pub emoji: String,
    pub completed_days: u32,
}

/// Seven days ending on `end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyReview {
    pub start: DateKey,
    pub end: DateKey,
    pub days_logged: u32,
    pub perfect_days: u32,
    pub journal_days: u32,
    /// Mean daily completion percentage over the seven days
    pub average_completion: u8,
    pub habits: Vec<HabitWeek>,
    pub tag_completions: BTreeMap<Tag, u32>,
}

impl WeeklyReview {
    pub fn best_habit(&self) -> Option<&HabitWeek> {
        self.habits
            .iter()
            .filter(|h| h.completed_days > 0)
            .max_by_key(|h| h.completed_days)
    }

    pub fn weakest_habit(&self) -> Option<&HabitWeek> {
        self.habits.iter().min_by_key(|h| h.completed_days)
    }
}

/// Analytics engine for processing habit data
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn user_progress(&self, habits: &[Habit], daily_streak: Option<&Streak>) -> UserProgress {
        let active: Vec<&Habit> = habits.iter().filter(|h| h.is_active).collect();
        let total_levels: u64 = habits.iter().map(|h| u64::from(h.progress.level)).sum();
        let average_level = if habits.is_empty() {
            0.0
        } else {
            total_levels as f64 / habits.len() as f64
        };

        UserProgress {
            total_habits: habits.len(),
            active_habits: active.len(),
            total_experience: habits.iter().map(|h| h.progress.experience).sum(),
            average_level: (average_level * 10.0).round() / 10.0,
            highest_tier: habits.iter().map(|h| h.progress.tier).max().unwrap_or_default(),
            total_completions: habits.iter().map(|h| h.progress.total_completions).sum(),
            badges_earned: habits.iter().map(|h| h.progress.badges.len()).sum(),
            daily_streak: daily_streak.map(|s| s.current_streak).unwrap_or(0),
            longest_daily_streak: daily_streak.map(|s| s.longest_streak).unwrap_or(0),
        }
    }

    /// Days on which every active habit that existed that day was completed
    pub fn perfect_days(&self, habits: &[Habit], entries: &[DailyEntry]) -> Vec<DateKey> {
        entries
            .iter()
            .filter(|entry| entry.is_perfect(&Self::habits_on(habits, entry.date)))
            .map(|entry| entry.date)
            .collect()
    }

    /// Rebuild the account-wide daily completion streak from scratch
    pub fn daily_streak(
        &self,
        user_id: &UserId,
        habits: &[Habit],
        entries: &[DailyEntry],
        today: DateKey,
        previous_longest: u32,
    ) -> Streak {
        Streak::calculate_from_days(
            user_id.clone(),
            StreakType::DailyCompletion,
            &self.perfect_days(habits, entries),
            today,
            previous_longest,
        )
    }

    pub fn achievement_metrics(
        &self,
        habits: &[Habit],
        entries: &[DailyEntry],
        daily_streak: &Streak,
    ) -> AchievementMetrics {
        AchievementMetrics {
            longest_daily_streak: daily_streak.longest_streak,
            perfect_days: self.perfect_days(habits, entries).len() as u32,
            journal_days: entries.iter().filter(|e| !e.notes.trim().is_empty()).count() as u32,
            finalized_days: entries.iter().filter(|e| e.is_completed).count() as u32,
        }
    }

    /// Catalogue entries the metrics satisfy that aren't unlocked yet
    pub fn newly_unlocked(
        &self,
        metrics: &AchievementMetrics,
        unlocked: &[Achievement],
    ) -> Vec<&'static AchievementDefinition> {
        CATALOG
            .iter()
            .filter(|def| def.is_met(metrics))
            .filter(|def| !unlocked.iter().any(|a| a.id == def.id))
            .collect()
    }

    /// Count tag completions in the goal's window ending today.
    ///
    /// A habit with several tags counts toward each of them.
    pub fn goal_progress(
        &self,
        goal: &Goal,
        habits: &[Habit],
        entries: &[DailyEntry],
        today: DateKey,
    ) -> GoalProgress {
        let window_start = today.add_days(1 - goal.period.window_days());
        let tagged: Vec<HabitId> = habits
            .iter()
            .filter(|h| h.tags.contains(&goal.tag))
            .map(|h| h.id)
            .collect();

        let completed = entries
            .iter()
            .filter(|e| e.date >= window_start && e.date <= today)
            .map(|e| tagged.iter().filter(|id| e.is_habit_complete(id)).count() as u32)
            .sum::<u32>();

        let percent = (u64::from(completed) * 100 / u64::from(goal.target_count.max(1))).min(100) as u8;

        GoalProgress {
            goal: goal.clone(),
            window_start,
            window_end: today,
            completed,
            percent,
            met: completed >= goal.target_count,
        }
    }

    pub fn weekly_review(&self, habits: &[Habit], entries: &[DailyEntry], end: DateKey) -> WeeklyReview {
        let start = end.add_days(-6);
        let week: Vec<&DailyEntry> = entries
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .collect();

        let mut percent_sum = 0u32;
        let mut perfect_days = 0;
        for offset in 0..7 {
            let day = start.add_days(offset);
            let day_habits = Self::habits_on(habits, day);
            if let Some(entry) = week.iter().find(|e| e.date == day) {
                percent_sum += u32::from(entry.completion_percent(&day_habits));
                if entry.is_perfect(&day_habits) {
                    perfect_days += 1;
                }
            }
        }

        let mut tag_completions = BTreeMap::new();
        let summaries = habits
            .iter()
            .filter(|h| h.is_active)
            .map(|habit| {
                let completed_days = week.iter().filter(|e| e.is_habit_complete(&habit.id)).count() as u32;
                for tag in &habit.tags {
                    *tag_completions.entry(*tag).or_insert(0) += completed_days;
                }
                HabitWeek {
                    habit_id: habit.id,
                    name: habit.name.clone(),
                    emoji: habit.emoji.clone(),
                    completed_days,
                }
            })
            .collect();

        WeeklyReview {
            start,
            end,
            days_logged: week.iter().filter(|e| e.has_activity()).count() as u32,
            perfect_days,
            journal_days: week.iter().filter(|e| !e.notes.trim().is_empty()).count() as u32,
            average_completion: ((percent_sum + 3) / 7) as u8,
            habits: summaries,
            tag_completions,
        }
    }

    /// Rule-based observations about a week, used when no model answers
    pub fn generate_insights(&self, review: &WeeklyReview) -> Vec<String> {
        let mut insights = Vec::new();

        if review.habits.is_empty() {
            insights.push("Start by creating your first habit to track!".to_string());
            return insights;
        }
        if review.days_logged == 0 {
            insights.push("Nothing logged this week yet. Check off one habit today to get moving.".to_string());
            return insights;
        }

        insights.push(format!(
            "You logged {} of 7 days with an average completion of {}%.",
            review.days_logged, review.average_completion
        ));

        if review.perfect_days > 0 {
            insights.push(format!(
                "{} perfect day{} this week. Every habit done!",
                review.perfect_days,
                if review.perfect_days == 1 { "" } else { "s" }
            ));
        }

        if let Some(best) = review.best_habit() {
            insights.push(format!(
                "{} {} was your most consistent habit ({} of 7 days).",
                best.emoji, best.name, best.completed_days
            ));
        }

        if let Some(weakest) = review.weakest_habit() {
            if weakest.completed_days < 3 {
                insights.push(format!(
                    "{} {} only got {} day{}. Try pairing it with something you already do daily.",
                    weakest.emoji,
                    weakest.name,
                    weakest.completed_days,
                    if weakest.completed_days == 1 { "" } else { "s" }
                ));
            }
        }

        if let Some((tag, count)) = review.tag_completions.iter().max_by_key(|(_, count)| **count) {
            if *count > 0 {
                insights.push(format!("Your strongest attribute this week was {} ({} completions).", tag, count));
            }
        }

        if review.journal_days == 0 {
            insights.push("A few lines of notes each evening make next week's review sharper.".to_string());
        }

        insights
    }

    /// Active habits that already existed on `day`
    fn habits_on(habits: &[Habit], day: DateKey) -> Vec<HabitId> {
        habits
            .iter()
            .filter(|h| h.is_active && h.created_on <= day)
            .map(|h| h.id)
            .collect()
    }
}
