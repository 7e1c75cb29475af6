//! Progression engine: the only writer of a habit's gamification state
//!
//! Every operation takes a habit snapshot and returns an updated copy plus a
//! summary of what changed. Nothing is persisted here; callers store the
//! returned habit.

use serde::Serialize;

use crate::domain::{Badge, CompletionGrant, DateKey, DomainError, Habit, Progression, Tier};
use crate::engine::difficulty::{clamp_rating, DifficultyModel};
use crate::engine::tier::{award_badges, evaluate, TierInputs};

/// Share of `experience_to_next` lost per newly missed day
pub const DEFAULT_DECAY_PERCENT_PER_DAY: u64 = 5;

/// Result of applying one event to a habit
#[derive(Debug, Clone, Serialize)]
pub struct ProgressionOutcome {
    pub habit: Habit,
    /// False when the event was a no-op (duplicate or closed day)
    pub changed: bool,
    pub experience_delta: i64,
    pub levels_gained: u32,
    pub previous_tier: Tier,
    pub new_badges: Vec<Badge>,
}

impl ProgressionOutcome {
    fn unchanged(habit: &Habit) -> Self {
        Self {
            habit: habit.clone(),
            changed: false,
            experience_delta: 0,
            levels_gained: 0,
            previous_tier: habit.progress.tier,
            new_badges: Vec::new(),
        }
    }

    /// `(from, to)` when the event moved the habit to another tier
    pub fn tier_change(&self) -> Option<(Tier, Tier)> {
        let current = self.habit.progress.tier;
        (current != self.previous_tier).then_some((self.previous_tier, current))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressionEngine {
    model: DifficultyModel,
    decay_percent_per_day: u64,
}

impl Default for ProgressionEngine {
    fn default() -> Self {
        Self::new(DifficultyModel::default())
    }
}

impl ProgressionEngine {
    pub fn new(model: DifficultyModel) -> Self {
        Self {
            model,
            decay_percent_per_day: DEFAULT_DECAY_PERCENT_PER_DAY,
        }
    }

    pub fn model(&self) -> &DifficultyModel {
        &self.model
    }

    /// Apply a check/uncheck for the day named by a raw `YYYY-MM-DD` key
    pub fn apply_completion_change(
        &self,
        habit: &Habit,
        completed: bool,
        date_key: &str,
    ) -> Result<ProgressionOutcome, DomainError> {
        let date = DateKey::parse(date_key)?;
        self.apply_completion(habit, completed, date)
    }

    pub fn apply_completion(
        &self,
        habit: &Habit,
        completed: bool,
        date: DateKey,
    ) -> Result<ProgressionOutcome, DomainError> {
        if completed {
            Ok(self.complete(habit, date))
        } else {
            self.reverse(habit, date)
        }
    }

    /// Explicit level-up: spend any experience already past the threshold
    pub fn level_up(&self, habit: &Habit) -> Result<ProgressionOutcome, DomainError> {
        let progress = &habit.progress;
        if progress.experience < progress.experience_to_next {
            return Err(DomainError::InsufficientExperience {
                experience: progress.experience,
                required: progress.experience_to_next,
            });
        }

        let mut updated = habit.clone();
        let levels_gained = self.spend_experience(&mut updated.progress, updated.difficulty_rating);
        updated.pending_grant = None;
        let new_badges = self.settle(&mut updated);

        Ok(self.outcome(habit, updated, 0, levels_gained, new_badges))
    }

    /// Change the difficulty rating and rescale the current level's threshold.
    ///
    /// Experience already earned is kept; if it now exceeds the threshold the
    /// surplus waits for the next completion or an explicit level-up.
    pub fn rerate_difficulty(&self, habit: &Habit, rating: u8) -> ProgressionOutcome {
        let rating = clamp_rating(rating);
        if rating == habit.difficulty_rating {
            return ProgressionOutcome::unchanged(habit);
        }

        let mut updated = habit.clone();
        updated.difficulty_rating = rating;
        updated.progress.experience_to_next =
            self.model.experience_required_for_level(updated.progress.level, rating);
        updated.pending_grant = None;
        let new_badges = self.settle(&mut updated);

        self.outcome(habit, updated, 0, 0, new_badges)
    }

    /// Penalize missed days, at most once per `today`.
    ///
    /// Breaks the streak and removes a share of `experience_to_next` for each
    /// missed day not already penalized. Experience never goes below zero and
    /// levels are never lost.
    pub fn apply_inactivity_decay(&self, habit: &Habit, today: DateKey) -> ProgressionOutcome {
        let progress = &habit.progress;
        if !habit.is_active || progress.last_decay_at == Some(today) {
            return ProgressionOutcome::unchanged(habit);
        }

        let reference = progress.last_completed.unwrap_or(habit.created_on);
        let first_missed = reference.next();
        let start = match progress.last_decay_at {
            Some(decayed) if decayed > first_missed => decayed,
            _ => first_missed,
        };
        let missed_days = today.days_since(start);
        if missed_days <= 0 {
            return ProgressionOutcome::unchanged(habit);
        }

        let mut updated = habit.clone();
        let p = &mut updated.progress;
        let penalty = (p.experience_to_next.saturating_mul(self.decay_percent_per_day) / 100)
            .saturating_mul(missed_days as u64);
        let lost = penalty.min(p.experience);
        p.experience -= lost;
        p.streak = 0;
        p.last_decay_at = Some(today);
        p.completion_rate = completion_rate(p.total_completions, habit.created_on, today);
        updated.pending_grant = None;
        let new_badges = self.settle(&mut updated);

        tracing::debug!(
            "Decayed habit {} by {} xp for {} missed day(s)",
            habit.id,
            lost,
            missed_days
        );
        self.outcome(habit, updated, -(lost as i64), 0, new_badges)
    }

    fn complete(&self, habit: &Habit, date: DateKey) -> ProgressionOutcome {
        if let Some(last) = habit.progress.last_completed {
            if last == date {
                // At most one completion per calendar day
                return ProgressionOutcome::unchanged(habit);
            }
            if date < last {
                tracing::debug!(
                    "Ignoring completion of habit {} for {}, already completed on {}",
                    habit.id,
                    date,
                    last
                );
                return ProgressionOutcome::unchanged(habit);
            }
        }

        let before = habit.progress.clone();
        let mut updated = habit.clone();
        let rating = updated.difficulty_rating;
        let p = &mut updated.progress;

        p.total_completions = p.total_completions.saturating_add(1);
        let granted = self.model.experience_for_completion(rating);
        p.experience = p.experience.saturating_add(granted);
        let levels_gained = self.spend_experience(p, rating);

        // Decay zeroes the streak but keeps `last_completed`; a backdated
        // completion for the following day starts a new run after that.
        p.streak = match p.last_completed {
            Some(last) if last == date.previous() && p.streak > 0 => p.streak.saturating_add(1),
            _ => 1,
        };
        p.longest_streak = p.longest_streak.max(p.streak);
        p.completion_rate = completion_rate(p.total_completions, habit.created_on, date);
        p.last_completed = Some(date);

        let new_badges = self.settle(&mut updated);
        updated.pending_grant = Some(CompletionGrant {
            date,
            experience_granted: granted,
            before,
        });

        self.outcome(habit, updated, granted as i64, levels_gained, new_badges)
    }

    /// Undo the completion recorded for `date`, restoring the exact prior state
    fn reverse(&self, habit: &Habit, date: DateKey) -> Result<ProgressionOutcome, DomainError> {
        let stale = || DomainError::StaleReversal {
            habit_id: habit.id.to_string(),
            date: date.to_string(),
        };

        if habit.progress.last_completed != Some(date) {
            return Err(stale());
        }
        let grant = match &habit.pending_grant {
            Some(grant) if grant.date == date => grant,
            _ => return Err(stale()),
        };

        let mut updated = habit.clone();
        updated.progress = grant.before.clone();
        updated.pending_grant = None;

        let levels_lost = habit.progress.level.saturating_sub(updated.progress.level);
        tracing::debug!(
            "Reversed completion of habit {} on {} ({} xp, {} level(s))",
            habit.id,
            date,
            grant.experience_granted,
            levels_lost
        );

        Ok(ProgressionOutcome {
            previous_tier: habit.progress.tier,
            changed: true,
            experience_delta: -(grant.experience_granted as i64),
            levels_gained: 0,
            new_badges: Vec::new(),
            habit: updated,
        })
    }

    /// Level up while experience covers the threshold; returns levels gained
    fn spend_experience(&self, progress: &mut Progression, rating: u8) -> u32 {
        let mut levels = 0;
        while progress.experience >= progress.experience_to_next {
            progress.experience -= progress.experience_to_next;
            progress.level = progress.level.saturating_add(1);
            progress.experience_to_next =
                self.model.experience_required_for_level(progress.level, rating);
            levels += 1;
        }
        levels
    }

    /// Re-derive badges and tier from freshly updated fields
    fn settle(&self, habit: &mut Habit) -> Vec<Badge> {
        let new_badges = award_badges(&mut habit.progress);
        habit.progress.tier = evaluate(&TierInputs::from_progress(&habit.progress, habit.difficulty_rating));
        new_badges
    }

    fn outcome(
        &self,
        original: &Habit,
        updated: Habit,
        experience_delta: i64,
        levels_gained: u32,
        new_badges: Vec<Badge>,
    ) -> ProgressionOutcome {
        let previous_tier = original.progress.tier;
        if updated.progress.tier != previous_tier {
            tracing::info!(
                "Habit '{}' moved from {} to {} tier",
                updated.name,
                previous_tier,
                updated.progress.tier
            );
        }
        ProgressionOutcome {
            habit: updated,
            changed: true,
            experience_delta,
            levels_gained,
            previous_tier,
            new_badges,
        }
    }
}

/// `round(100 * total / days)` capped at 100, where `days` counts the creation
/// day itself so a habit completed on the day it was created sits at 100%.
pub fn completion_rate(total_completions: u32, created_on: DateKey, as_of: DateKey) -> u8 {
    let days = (as_of.days_since(created_on) + 1).max(1) as u64;
    let total = u64::from(total_completions);
    let rounded = (200 * total + days) / (2 * days);
    rounded.min(100) as u8
}
