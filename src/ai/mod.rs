//! Text generation collaborator
//!
//! Model output is never load-bearing. Every feature that asks a model for
//! text has a deterministic fallback, so the tracker behaves the same with no
//! backend configured at all.

pub mod assistant;
pub mod cache;

pub use assistant::*;
pub use cache::ResponseCache;

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from a model backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AiError {
    #[error("Upstream model unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Model {model} returned an empty response")]
    EmptyResponse { model: String },
}

/// What a prompt is for; selects the model chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Conversational coaching
    Chat,
    /// Short one-liners such as suggestions and motivation
    Simple,
    /// Rating how hard a habit is
    Difficulty,
    /// Longer reflective analysis such as weekly insights
    Analysis,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Chat => "chat",
            TaskKind::Simple => "simple",
            TaskKind::Difficulty => "difficulty",
            TaskKind::Analysis => "analysis",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that can turn a prompt into text with a named model
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, AiError>;
}

/// Backend used when nothing is configured: every call fails fast
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineBackend;

#[async_trait]
impl ModelBackend for OfflineBackend {
    async fn complete(&self, model: &str, _prompt: &str) -> Result<String, AiError> {
        Err(AiError::UpstreamUnavailable(format!(
            "no backend configured for model {}",
            model
        )))
    }
}

/// Ordered model preferences per task kind.
///
/// Pure configuration; the generator walks a chain front to back and stops at
/// the first model that answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelChains {
    pub chat: Vec<String>,
    pub simple: Vec<String>,
    pub difficulty: Vec<String>,
    pub analysis: Vec<String>,
}

impl Default for ModelChains {
    fn default() -> Self {
        fn chain(models: &[&str]) -> Vec<String> {
            models.iter().map(|m| m.to_string()).collect()
        }

        Self {
            chat: chain(&["gpt-4o", "gpt-4o-mini", "gpt-3.5-turbo"]),
            simple: chain(&["gpt-4o-mini", "gpt-3.5-turbo"]),
            difficulty: chain(&["gpt-4o-mini", "gpt-3.5-turbo"]),
            analysis: chain(&["gpt-4o", "gpt-4o-mini"]),
        }
    }
}

impl ModelChains {
    pub fn for_task(&self, task: TaskKind) -> &[String] {
        match task {
            TaskKind::Chat => &self.chat,
            TaskKind::Simple => &self.simple,
            TaskKind::Difficulty => &self.difficulty,
            TaskKind::Analysis => &self.analysis,
        }
    }

    /// Replace one task's chain
    pub fn with_chain(mut self, task: TaskKind, models: Vec<String>) -> Self {
        match task {
            TaskKind::Chat => self.chat = models,
            TaskKind::Simple => self.simple = models,
            TaskKind::Difficulty => self.difficulty = models,
            TaskKind::Analysis => self.analysis = models,
        }
        self
    }
}
