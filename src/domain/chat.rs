//! Chat history with the assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, MessageId, UserId};

pub const MAX_MESSAGE_LEN: usize = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub user_id: UserId,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(user_id: UserId, role: ChatRole, content: String) -> Result<Self, DomainError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(DomainError::Validation {
                message: "Message cannot be empty".to_string(),
            });
        }
        if content.len() > MAX_MESSAGE_LEN {
            return Err(DomainError::Validation {
                message: format!("Message cannot be longer than {} characters", MAX_MESSAGE_LEN),
            });
        }

        Ok(Self {
            id: MessageId::new(),
            user_id,
            role,
            content,
            created_at: Utc::now(),
        })
    }
}
