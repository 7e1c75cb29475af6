/// Tools for the daily journal
///
/// This module implements daily_entry_get, daily_entry_edit, daily_entry_save
/// and daily_entry_finalize. Edits go into the draft buffer first and are
/// written once the caller goes quiet, or immediately on an explicit save.

use std::collections::BTreeMap;
use std::time::Instant;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domain::{DailyEntry, DateKey, Habit, Subtask, UserId};
use crate::engine::reconciler::{apply_edit, filter_orphans, finalize, DayPlan, DraftBuffer};
use crate::engine::{EntryEdit, EntryState};
use crate::storage::HabitStorage;
use crate::tools::{
    auto_finalize_past, parse_habit_id, parse_subtask_id, refresh_account, unlocked_line,
    RequestContext, ToolError, UnlockedAchievement,
};

#[derive(Debug, Default, Deserialize, JsonSchema)]
pub struct DailyEntryParams {
    /// Day as YYYY-MM-DD (default: today in the caller's timezone)
    pub date: Option<String>,
}

/// A partial change to one day's entry
#[derive(Debug, Default, Clone, Deserialize, JsonSchema)]
pub struct EditEntryParams {
    /// Day as YYYY-MM-DD (default: today in the caller's timezone)
    pub date: Option<String>,
    /// Habit id to completed flag
    #[serde(default)]
    pub habit_completions: BTreeMap<String, bool>,
    /// Subtask id to completed flag; a habit with subtasks is complete when all are
    #[serde(default)]
    pub subtask_completions: BTreeMap<String, bool>,
    pub notes: Option<String>,
    /// 1-5; overrides the derived score
    pub punctuality_score: Option<u8>,
    /// 1-5; overrides the derived score
    pub adherence_score: Option<u8>,
}

impl EditEntryParams {
    fn to_edit(&self) -> Result<EntryEdit, ToolError> {
        let mut edit = EntryEdit {
            notes: self.notes.clone(),
            punctuality_score: self.punctuality_score,
            adherence_score: self.adherence_score,
            ..EntryEdit::default()
        };
        for (raw, done) in &self.habit_completions {
            edit.habit_completions.insert(parse_habit_id(raw)?, *done);
        }
        for (raw, done) in &self.subtask_completions {
            edit.subtask_completions.insert(parse_subtask_id(raw)?, *done);
        }
        Ok(edit)
    }
}

#[derive(Debug, Serialize)]
pub struct EntrySubtaskView {
    pub subtask_id: String,
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Serialize)]
pub struct EntryHabitView {
    pub habit_id: String,
    pub name: String,
    pub emoji: String,
    pub completed: bool,
    pub subtasks: Vec<EntrySubtaskView>,
}

#[derive(Debug, Serialize)]
pub struct DailyEntryResponse {
    pub success: bool,
    pub date: DateKey,
    pub state: EntryState,
    pub entry: DailyEntry,
    pub habits: Vec<EntryHabitView>,
    pub completion_percent: u8,
    pub unlocked_achievements: Vec<UnlockedAchievement>,
    pub message: String,
}

/// Everything an entry for one user is scored against
struct Day {
    habits: Vec<Habit>,
    subtasks: Vec<Subtask>,
    plan: DayPlan,
}

impl Day {
    fn load<S: HabitStorage>(storage: &S, user_id: &UserId) -> Result<Self, ToolError> {
        let habits = storage.list_habits(user_id, false)?;
        let subtasks = storage.list_subtasks(user_id, None, true)?;
        let plan = DayPlan::new(&habits, &subtasks);
        Ok(Self { habits, subtasks, plan })
    }

    /// The stored entry with orphaned keys dropped, or a fresh draft
    fn entry<S: HabitStorage>(&self, storage: &S, user_id: &UserId, date: DateKey) -> Result<DailyEntry, ToolError> {
        let mut entry = storage
            .find_entry(user_id, date)?
            .unwrap_or_else(|| DailyEntry::new(user_id.clone(), date));
        filter_orphans(&mut entry, &self.plan);
        Ok(entry)
    }

    fn respond(
        &self,
        entry: DailyEntry,
        state: EntryState,
        unlocked: Vec<UnlockedAchievement>,
        headline: &str,
    ) -> DailyEntryResponse {
        let habits: Vec<EntryHabitView> = self
            .habits
            .iter()
            .filter(|h| h.is_active)
            .map(|h| EntryHabitView {
                habit_id: h.id.to_string(),
                name: h.name.clone(),
                emoji: h.emoji.clone(),
                completed: entry.is_habit_complete(&h.id),
                subtasks: self
                    .subtasks
                    .iter()
                    .filter(|s| s.habit_id == h.id)
                    .map(|s| EntrySubtaskView {
                        subtask_id: s.id.to_string(),
                        title: s.title.clone(),
                        completed: entry.subtask_completions.get(&s.id).copied().unwrap_or(false),
                    })
                    .collect(),
            })
            .collect();
        let completion_percent = entry.completion_percent(self.plan.active_habits());

        let checklist = habits
            .iter()
            .map(|h| format!("{} {} {}", if h.completed { "✅" } else { "⬜" }, h.emoji, h.name))
            .collect::<Vec<_>>()
            .join("\n");
        let message = format!(
            "{}\n📅 {} ({}) | {}% done | punctuality {}/5 | adherence {}/5\n{}{}",
            headline,
            entry.date,
            state_label(state),
            completion_percent,
            entry.punctuality_score,
            entry.adherence_score,
            checklist,
            unlocked_line(&unlocked)
        );

        DailyEntryResponse {
            success: true,
            date: entry.date,
            state,
            habits,
            completion_percent,
            unlocked_achievements: unlocked,
            message,
            entry,
        }
    }
}

fn state_label(state: EntryState) -> &'static str {
    match state {
        EntryState::Draft => "unsaved changes",
        EntryState::Saved => "saved",
        EntryState::Finalized => "finalized 🔒",
    }
}

/// Apply an edit to the stored entry for (user, date) and write it.
///
/// This is also what a debounced draft flush runs.
pub fn persist_edit<S: HabitStorage>(
    storage: &S,
    user_id: &UserId,
    date: DateKey,
    edit: &EntryEdit,
) -> Result<DailyEntry, ToolError> {
    let day = Day::load(storage, user_id)?;
    let mut entry = day.entry(storage, user_id, date)?;
    apply_edit(&mut entry, edit, &day.plan)?;
    storage.save_entry(&entry)?;
    tracing::debug!("Saved daily entry {} for {}", date, user_id);
    Ok(entry)
}

/// Show a day's entry with any unsaved draft laid over it
pub fn get_daily_entry<S: HabitStorage>(
    storage: &S,
    drafts: &DraftBuffer,
    ctx: &RequestContext,
    params: DailyEntryParams,
) -> Result<DailyEntryResponse, ToolError> {
    let date = ctx.date_or_today(params.date.as_deref())?;
    auto_finalize_past(storage, ctx)?;

    let day = Day::load(storage, &ctx.user_id)?;
    let mut entry = day.entry(storage, &ctx.user_id, date)?;
    let pending = drafts.pending(&ctx.user_id, date);

    if let Some(edit) = pending {
        if !entry.is_completed {
            let mut overlay = entry.clone();
            match apply_edit(&mut overlay, edit, &day.plan) {
                Ok(()) => entry = overlay,
                Err(err) => tracing::warn!("Pending draft for {} no longer applies: {}", date, err),
            }
        }
    }

    let state = EntryState::of(&entry, pending.is_some());
    Ok(day.respond(entry, state, Vec::new(), "📓 Daily entry"))
}

/// Response to a buffered edit
#[derive(Debug, Serialize)]
pub struct EditEntryResponse {
    pub success: bool,
    pub date: DateKey,
    pub state: EntryState,
    /// How the entry will look once the draft is written
    pub preview: DailyEntry,
    /// Quiet time after which the draft is written
    pub flush_after_ms: u64,
    pub message: String,
}

/// Buffer an edit; it is written after the quiet period unless more edits arrive
pub fn edit_daily_entry<S: HabitStorage>(
    storage: &S,
    drafts: &mut DraftBuffer,
    ctx: &RequestContext,
    params: EditEntryParams,
    now: Instant,
) -> Result<EditEntryResponse, ToolError> {
    let date = ctx.recorded_date(params.date.as_deref())?;
    let edit = params.to_edit()?;
    if edit.is_empty() {
        return Err(ToolError::InvalidParams("Nothing to change".to_string()));
    }

    // Reject now what the flush would reject later
    let day = Day::load(storage, &ctx.user_id)?;
    let mut preview = day.entry(storage, &ctx.user_id, date)?;
    if let Some(pending) = drafts.pending(&ctx.user_id, date) {
        apply_edit(&mut preview, pending, &day.plan)?;
    }
    apply_edit(&mut preview, &edit, &day.plan)?;

    drafts.record(ctx.user_id.clone(), date, edit, now);
    let flush_after_ms = drafts.quiet_period().as_millis() as u64;

    Ok(EditEntryResponse {
        success: true,
        date,
        state: EntryState::Draft,
        message: format!(
            "📝 Draft for {} updated ({}% done); saving after {} ms of quiet.",
            date,
            preview.completion_percent(day.plan.active_habits()),
            flush_after_ms
        ),
        preview,
        flush_after_ms,
    })
}

/// Write any pending draft plus this edit right away
pub fn save_daily_entry<S: HabitStorage>(
    storage: &S,
    drafts: &mut DraftBuffer,
    ctx: &RequestContext,
    params: EditEntryParams,
) -> Result<DailyEntryResponse, ToolError> {
    let date = ctx.recorded_date(params.date.as_deref())?;
    let edit = params.to_edit()?;

    let pending = drafts.take(&ctx.user_id, date);
    let mut combined = pending.clone().unwrap_or_default();
    combined.merge(edit);

    if let Err(err) = persist_edit(storage, &ctx.user_id, date, &combined) {
        let key = (ctx.user_id.clone(), date);
        if err.is_retryable() {
            drafts.restore(key, combined, Instant::now());
        } else if let Some(pending) = pending {
            drafts.restore(key, pending, Instant::now());
        }
        return Err(err);
    }

    let account = refresh_account(storage, ctx)?;
    let day = Day::load(storage, &ctx.user_id)?;
    let entry = day.entry(storage, &ctx.user_id, date)?;
    let state = EntryState::of(&entry, false);
    Ok(day.respond(entry, state, account.unlocked, "💾 Daily entry saved"))
}

/// Lock a day's entry against further edits, writing any pending draft first
pub fn finalize_daily_entry<S: HabitStorage>(
    storage: &S,
    drafts: &mut DraftBuffer,
    ctx: &RequestContext,
    params: DailyEntryParams,
) -> Result<DailyEntryResponse, ToolError> {
    let date = ctx.recorded_date(params.date.as_deref())?;

    if let Some(pending) = drafts.take(&ctx.user_id, date) {
        if let Err(err) = persist_edit(storage, &ctx.user_id, date, &pending) {
            if err.is_retryable() {
                drafts.restore((ctx.user_id.clone(), date), pending, Instant::now());
                return Err(err);
            }
            tracing::warn!("Dropping draft for {} that cannot be applied: {}", date, err);
        }
    }

    let day = Day::load(storage, &ctx.user_id)?;
    let mut entry = day.entry(storage, &ctx.user_id, date)?;
    let headline = if finalize(&mut entry) {
        storage.save_entry(&entry)?;
        tracing::info!("Finalized daily entry {} for {}", date, ctx.user_id);
        "🔒 Daily entry finalized"
    } else {
        "🔒 Daily entry was already finalized"
    };

    let account = refresh_account(storage, ctx)?;
    Ok(day.respond(entry, EntryState::Finalized, account.unlocked, headline))
}
