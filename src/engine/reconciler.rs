//! Daily entry reconciliation
//!
//! Draft edits for a (user, day) pair are merged in a `DraftBuffer` and only
//! written once the user has been quiet for the debounce interval. Applying an
//! edit, deriving completions from subtasks, and auto-finalizing past days are
//! all plain functions over a `DailyEntry`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{DailyEntry, DateKey, DomainError, Habit, HabitId, Subtask, SubtaskId, UserId};

/// Quiet period before a draft is written
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Lifecycle of one day's entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryState {
    /// Edits are waiting in the draft buffer
    Draft,
    Saved,
    Finalized,
}

impl EntryState {
    pub fn of(entry: &DailyEntry, has_pending_draft: bool) -> Self {
        if entry.is_completed {
            EntryState::Finalized
        } else if has_pending_draft {
            EntryState::Draft
        } else {
            EntryState::Saved
        }
    }
}

/// A partial change to a daily entry; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryEdit {
    #[serde(default)]
    pub habit_completions: BTreeMap<HabitId, bool>,
    #[serde(default)]
    pub subtask_completions: BTreeMap<SubtaskId, bool>,
    pub notes: Option<String>,
    pub punctuality_score: Option<u8>,
    pub adherence_score: Option<u8>,
}

impl EntryEdit {
    pub fn is_empty(&self) -> bool {
        self.habit_completions.is_empty()
            && self.subtask_completions.is_empty()
            && self.notes.is_none()
            && self.punctuality_score.is_none()
            && self.adherence_score.is_none()
    }

    /// Fold a later edit on top of this one; the later value wins per field
    pub fn merge(&mut self, later: EntryEdit) {
        self.habit_completions.extend(later.habit_completions);
        self.subtask_completions.extend(later.subtask_completions);
        if later.notes.is_some() {
            self.notes = later.notes;
        }
        if later.punctuality_score.is_some() {
            self.punctuality_score = later.punctuality_score;
        }
        if later.adherence_score.is_some() {
            self.adherence_score = later.adherence_score;
        }
    }
}

/// The habits and subtasks a day's entry is scored against
#[derive(Debug, Clone, Default)]
pub struct DayPlan {
    known: HashSet<HabitId>,
    active: Vec<HabitId>,
    subtasks: HashMap<HabitId, Vec<SubtaskId>>,
}

impl DayPlan {
    pub fn new(habits: &[Habit], subtasks: &[Subtask]) -> Self {
        let known = habits.iter().map(|h| h.id).collect();
        let active: Vec<HabitId> = habits.iter().filter(|h| h.is_active).map(|h| h.id).collect();

        let mut by_habit: HashMap<HabitId, Vec<SubtaskId>> = HashMap::new();
        for subtask in subtasks.iter().filter(|s| s.is_active) {
            by_habit.entry(subtask.habit_id).or_default().push(subtask.id);
        }

        Self {
            known,
            active,
            subtasks: by_habit,
        }
    }

    /// Active habit ids, the denominator of a day's completion percentage
    pub fn active_habits(&self) -> &[HabitId] {
        &self.active
    }

    pub fn knows(&self, habit_id: &HabitId) -> bool {
        self.known.contains(habit_id)
    }
}

/// Apply an edit to a non-finalized entry and re-derive what depends on it
pub fn apply_edit(entry: &mut DailyEntry, edit: &EntryEdit, plan: &DayPlan) -> Result<(), DomainError> {
    entry.ensure_editable()?;

    if let Some(habit_id) = edit.habit_completions.keys().find(|id| !plan.knows(id)) {
        return Err(DomainError::Validation {
            message: format!("Unknown habit {} in daily entry", habit_id),
        });
    }

    if edit.punctuality_score.is_some() || edit.adherence_score.is_some() {
        entry.set_scores(
            edit.punctuality_score.unwrap_or(entry.punctuality_score),
            edit.adherence_score.unwrap_or(entry.adherence_score),
        )?;
    }
    if let Some(notes) = &edit.notes {
        entry.set_notes(notes.clone())?;
    }

    entry.habit_completions.extend(edit.habit_completions.iter().map(|(k, v)| (*k, *v)));
    entry.subtask_completions.extend(edit.subtask_completions.iter().map(|(k, v)| (*k, *v)));

    derive_from_subtasks(entry, plan);
    entry.derive_scores(plan.active_habits());
    entry.updated_at = Utc::now();
    Ok(())
}

/// A habit with active subtasks is complete exactly when all of them are
pub fn derive_from_subtasks(entry: &mut DailyEntry, plan: &DayPlan) {
    for (habit_id, subtask_ids) in &plan.subtasks {
        if subtask_ids.is_empty() {
            continue;
        }
        let all_done = subtask_ids
            .iter()
            .all(|id| entry.subtask_completions.get(id).copied().unwrap_or(false));
        entry.habit_completions.insert(*habit_id, all_done);
    }
}

/// Drop completion keys of deleted habits before an entry is shown or scored
pub fn filter_orphans(entry: &mut DailyEntry, plan: &DayPlan) {
    entry.retain_habits(&plan.known);
}

/// Lock an entry. Returns false if it was already finalized.
pub fn finalize(entry: &mut DailyEntry) -> bool {
    if entry.is_completed {
        return false;
    }
    entry.is_completed = true;
    entry.updated_at = Utc::now();
    true
}

/// Finalize a past entry that has activity, at most once per entry.
///
/// Returns true only on the call that actually finalized it.
pub fn auto_finalize(entry: &mut DailyEntry, today: DateKey) -> bool {
    if entry.is_completed || entry.auto_finalized || entry.date >= today || !entry.has_activity() {
        return false;
    }
    entry.is_completed = true;
    entry.auto_finalized = true;
    entry.updated_at = Utc::now();
    true
}

/// Key of a pending draft
pub type DraftKey = (UserId, DateKey);

#[derive(Debug, Clone)]
struct PendingDraft {
    edit: EntryEdit,
    due: Instant,
}

/// Debounced store of not-yet-written edits.
///
/// Time is passed in explicitly so the buffer stays deterministic; the server
/// loop sleeps until `next_deadline` and then calls `take_due`.
#[derive(Debug, Clone)]
pub struct DraftBuffer {
    quiet_period: Duration,
    drafts: HashMap<DraftKey, PendingDraft>,
}

impl Default for DraftBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DraftBuffer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            drafts: HashMap::new(),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Merge an edit into the draft for (user, date) and restart its timer
    pub fn record(&mut self, user_id: UserId, date: DateKey, edit: EntryEdit, now: Instant) {
        let due = now + self.quiet_period;
        self.drafts
            .entry((user_id, date))
            .and_modify(|pending| {
                pending.edit.merge(edit.clone());
                pending.due = due;
            })
            .or_insert(PendingDraft { edit, due });
    }

    pub fn pending(&self, user_id: &UserId, date: DateKey) -> Option<&EntryEdit> {
        self.drafts.get(&(user_id.clone(), date)).map(|p| &p.edit)
    }

    /// Remove a draft regardless of its timer, e.g. for an explicit save
    pub fn take(&mut self, user_id: &UserId, date: DateKey) -> Option<EntryEdit> {
        self.drafts.remove(&(user_id.clone(), date)).map(|p| p.edit)
    }

    /// Earliest moment a draft becomes due
    pub fn next_deadline(&self) -> Option<Instant> {
        self.drafts.values().map(|p| p.due).min()
    }

    /// Remove and return every draft whose quiet period has elapsed
    pub fn take_due(&mut self, now: Instant) -> Vec<(DraftKey, EntryEdit)> {
        let due: Vec<DraftKey> = self
            .drafts
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(key, _)| key.clone())
            .collect();

        due.into_iter()
            .filter_map(|key| self.drafts.remove(&key).map(|p| (key, p.edit)))
            .collect()
    }

    /// Put back a draft whose write failed; newer edits stay on top
    pub fn restore(&mut self, key: DraftKey, edit: EntryEdit, now: Instant) {
        let due = now + self.quiet_period;
        match self.drafts.remove(&key) {
            Some(newer) => {
                let mut merged = edit;
                merged.merge(newer.edit);
                self.drafts.insert(key, PendingDraft { edit: merged, due });
            }
            None => {
                self.drafts.insert(key, PendingDraft { edit, due });
            }
        }
    }

    /// Forget every draft of one user without writing it
    pub fn discard_user(&mut self, user_id: &UserId) -> usize {
        let before = self.drafts.len();
        self.drafts.retain(|(owner, _), _| owner != user_id);
        before - self.drafts.len()
    }

    /// Everything still pending, for shutdown
    pub fn drain(&mut self) -> Vec<(DraftKey, EntryEdit)> {
        self.drafts.drain().map(|(key, p)| (key, p.edit)).collect()
    }

    pub fn len(&self) -> usize {
        self.drafts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drafts.is_empty()
    }
}
