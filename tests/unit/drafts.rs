use super::*;
use pushforward::engine::reconciler::{apply_edit, auto_finalize, DayPlan, EntryEdit};
use std::time::{Duration, Instant};

fn notes(text: &str) -> EntryEdit {
    EntryEdit {
        notes: Some(text.to_string()),
        ..EntryEdit::default()
    }
}

#[test]
fn test_superseded_edit_is_never_flushed_alone() {
    let mut drafts = DraftBuffer::new(Duration::from_millis(1500));
    let user = UserId::new("u1");
    let day = key("2024-05-01");
    let t0 = Instant::now();

    drafts.record(user.clone(), day, notes("first"), t0);
    drafts.record(user.clone(), day, notes("second"), t0 + Duration::from_secs(1));

    // The first timer would have fired here
    assert!(drafts.take_due(t0 + Duration::from_millis(2000)).is_empty());

    let due = drafts.take_due(t0 + Duration::from_millis(2500));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].1.notes.as_deref(), Some("second"));
    assert!(drafts.is_empty());
}

#[test]
fn test_failed_flush_keeps_newer_edits_on_top() {
    let mut drafts = DraftBuffer::new(Duration::from_millis(1500));
    let user = UserId::new("u1");
    let day = key("2024-05-01");
    let t0 = Instant::now();

    drafts.record(user.clone(), day, notes("old"), t0);
    let (draft_key, edit) = drafts.take_due(t0 + Duration::from_secs(2)).remove(0);
    drafts.record(user.clone(), day, notes("new"), t0 + Duration::from_secs(3));
    drafts.restore(draft_key, edit, t0 + Duration::from_secs(3));

    assert_eq!(drafts.pending(&user, day).unwrap().notes.as_deref(), Some("new"));
    assert_eq!(drafts.next_deadline(), Some(t0 + Duration::from_millis(4500)));
}

#[test]
fn test_finalized_entry_stays_finalized() {
    let habit = Habit::new(UserId::new("u1"), "Run".to_string(), None, vec![], None, key("2024-05-01")).unwrap();
    let plan = DayPlan::new(std::slice::from_ref(&habit), &[]);
    let mut entry = DailyEntry::new(UserId::new("u1"), key("2024-05-01"));
    apply_edit(&mut entry, &notes("done"), &plan).unwrap();

    assert!(auto_finalize(&mut entry, key("2024-05-02")));
    assert!(!auto_finalize(&mut entry, key("2024-05-03")));
    assert!(entry.auto_finalized);

    let err = apply_edit(&mut entry, &notes("again"), &plan).unwrap_err();
    assert!(matches!(err, DomainError::EntryFinalized { .. }));
}
