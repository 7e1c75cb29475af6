//! Subtask entity: an ordered checklist item belonging to one habit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, HabitId, SubtaskId, UserId};

pub const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub title: String,
    pub order: i32,
    /// Soft removal keeps historical completion keys meaningful
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(
        user_id: UserId,
        habit_id: HabitId,
        title: String,
        order: i32,
    ) -> Result<Self, DomainError> {
        let trimmed = title.trim();
        if trimmed.is_empty() {
            return Err(DomainError::Validation {
                message: "Subtask title cannot be empty".to_string(),
            });
        }
        if trimmed.chars().count() > MAX_TITLE_CHARS {
            return Err(DomainError::Validation {
                message: format!("Subtask title cannot be longer than {} characters", MAX_TITLE_CHARS),
            });
        }

        Ok(Self {
            id: SubtaskId::new(),
            habit_id,
            user_id,
            title: trimmed.to_string(),
            order,
            is_active: true,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtask_title_validation() {
        let habit_id = HabitId::new();
        assert!(Subtask::new(UserId::new("u1"), habit_id, " ".to_string(), 0).is_err());
        let subtask = Subtask::new(UserId::new("u1"), habit_id, " Warm up ".to_string(), 1).unwrap();
        assert_eq!(subtask.title, "Warm up");
        assert!(subtask.is_active);
    }
}
