//! Goal entity: a target completion count for one tag over a rolling period
//!
//! Goals are read-side only. Nothing in the progression engine mutates them;
//! analytics counts completions against them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, GoalId, GoalPeriod, Tag, UserId};

pub const MAX_TARGET_COUNT: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub user_id: UserId,
    pub tag: Tag,
    pub period: GoalPeriod,
    pub target_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn new(
        user_id: UserId,
        tag: Tag,
        period: GoalPeriod,
        target_count: u32,
    ) -> Result<Self, DomainError> {
        if target_count == 0 || target_count > MAX_TARGET_COUNT {
            return Err(DomainError::InvalidValue {
                message: format!("Target count must be between 1 and {}", MAX_TARGET_COUNT),
            });
        }

        Ok(Self {
            id: GoalId::new(),
            user_id,
            tag,
            period,
            target_count,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_count_bounds() {
        assert!(Goal::new(UserId::new("u1"), Tag::Str, GoalPeriod::Weekly, 0).is_err());
        assert!(Goal::new(UserId::new("u1"), Tag::Str, GoalPeriod::Weekly, 1001).is_err());
        assert!(Goal::new(UserId::new("u1"), Tag::Str, GoalPeriod::Weekly, 5).is_ok());
    }
}
