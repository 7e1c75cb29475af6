/// Public library interface for the PushForward MCP server
///
/// This module exports the server and the layers it is built from so that
/// the binary, integration tests and embedding applications can drive the
/// tracker without going through stdio.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub mod ai;
pub mod analytics;
pub mod domain;
pub mod engine;
pub mod mcp;
pub mod storage;
pub mod tools;

// Re-export the types most callers need
pub use ai::{Assistant, FallbackGenerator, ModelBackend, ModelChains, OfflineBackend};
pub use domain::*;
pub use engine::{DraftBuffer, ProgressionEngine, TimeZoneResolver};
pub use storage::{HabitStorage, SqliteStorage, StorageError};
pub use tools::{ErrorKind, RequestContext, ToolError};

use engine::reconciler::{DraftKey, EntryEdit, DEFAULT_DEBOUNCE};

/// Errors that can occur during server operation
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] StorageError),

    #[error("Domain validation error: {0}")]
    Domain(#[from] DomainError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Runtime settings, normally filled from the command line
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// User for calls that don't name one in `_meta.userId`
    pub default_user: String,
    /// IANA zone for calls that don't send `_meta.timezone`
    pub default_timezone: String,
    /// Quiet period before a buffered daily entry edit is written
    pub debounce: Duration,
    /// How long generated text is reused for an identical prompt
    pub ai_cache_ttl: Duration,
    pub model_chains: ModelChains,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_user: "local".to_string(),
            default_timezone: engine::timezone::FALLBACK_ZONE.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            ai_cache_ttl: ai::cache::DEFAULT_TTL,
            model_chains: ModelChains::default(),
        }
    }
}

/// Main tracker server.
///
/// Owns the storage, the progression rules, the assistant and the buffer of
/// unsaved daily entry edits. The MCP layer hands it decoded tool calls.
pub struct PushForwardServer {
    storage: SqliteStorage,
    engine: ProgressionEngine,
    assistant: Assistant,
    drafts: DraftBuffer,
    resolver: TimeZoneResolver,
    config: ServerConfig,
}

impl PushForwardServer {
    /// Build a server over an already opened storage
    pub fn new(storage: SqliteStorage, config: ServerConfig) -> Self {
        let assistant = Assistant::new(FallbackGenerator::new(
            Box::new(OfflineBackend),
            config.model_chains.clone(),
            config.ai_cache_ttl,
        ));

        Self {
            storage,
            engine: ProgressionEngine::default(),
            assistant,
            drafts: DraftBuffer::new(config.debounce),
            resolver: TimeZoneResolver::new(&config.default_timezone),
            config,
        }
    }

    /// Open (and migrate) the database at `db_path` and build a server on it
    pub async fn open(db_path: PathBuf, config: ServerConfig) -> Result<Self, ServerError> {
        tracing::info!("Initializing PushForward server with database: {:?}", db_path);
        let storage = SqliteStorage::new(db_path)?;
        Ok(Self::new(storage, config))
    }

    /// Swap in an assistant backed by a real model backend
    pub fn with_assistant(mut self, assistant: Assistant) -> Self {
        self.assistant = assistant;
        self
    }

    /// Resolve who is calling and their local day, falling back to defaults
    pub fn context(&self, user_id: Option<&str>, timezone: Option<&str>) -> RequestContext {
        let user = match user_id.map(str::trim) {
            Some(user) if !user.is_empty() => user,
            _ => self.config.default_user.as_str(),
        };
        RequestContext::at(UserId::new(user), self.resolver.resolve(timezone), Utc::now())
    }

    /// Run one tool by name. Arguments are decoded into the tool's parameter type.
    pub async fn call_tool(&mut self, name: &str, arguments: Value, ctx: &RequestContext) -> Result<Value, ToolError> {
        tracing::debug!("Calling tool {} for {}", name, ctx.user_id);
        let storage = &self.storage;

        match name {
            "habit_create" => encode(tools::create_habit(storage, &self.assistant, ctx, decode(arguments)?).await?),
            "habit_update" => encode(tools::update_habit(storage, &self.engine, ctx, decode(arguments)?)?),
            "habit_delete" => encode(tools::delete_habit(storage, ctx, decode(arguments)?)?),
            "habit_list" => encode(tools::list_habits(storage, &self.engine, ctx, decode(arguments)?)?),
            "habit_progress" => encode(tools::record_progress(storage, &self.engine, ctx, decode(arguments)?)?),
            "habit_level_up" => encode(tools::level_up_habit(storage, &self.engine, ctx, decode(arguments)?)?),
            "habit_analyze" => encode(
                tools::analyze_habit(storage, &self.engine, &self.assistant, ctx, decode(arguments)?).await?,
            ),
            "subtask_add" => encode(tools::add_subtask(storage, ctx, decode(arguments)?)?),
            "subtask_remove" => encode(tools::remove_subtask(storage, ctx, decode(arguments)?)?),
            "daily_entry_get" => encode(tools::get_daily_entry(storage, &self.drafts, ctx, decode(arguments)?)?),
            "daily_entry_edit" => encode(tools::edit_daily_entry(
                storage,
                &mut self.drafts,
                ctx,
                decode(arguments)?,
                Instant::now(),
            )?),
            "daily_entry_save" => encode(tools::save_daily_entry(storage, &mut self.drafts, ctx, decode(arguments)?)?),
            "daily_entry_finalize" => {
                encode(tools::finalize_daily_entry(storage, &mut self.drafts, ctx, decode(arguments)?)?)
            }
            "goal_create" => encode(tools::create_goal(storage, ctx, decode(arguments)?)?),
            "goal_progress" => encode(tools::goal_progress(storage, ctx, decode(arguments)?)?),
            "weekly_review" => encode(tools::weekly_review(storage, &self.assistant, ctx, decode(arguments)?).await?),
            "habit_suggestions" => {
                encode(tools::habit_suggestions(storage, &self.assistant, ctx, decode(arguments)?).await?)
            }
            "chat" => encode(tools::chat(storage, &self.assistant, ctx, decode(arguments)?).await?),
            "user_reset" => encode(tools::reset_user(storage, &mut self.drafts, ctx, decode(arguments)?)?),
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Write every draft whose quiet period has passed; returns how many were written
    pub fn flush_due_drafts(&mut self, now: Instant) -> usize {
        let due = self.drafts.take_due(now);
        self.write_drafts(due, Some(now))
    }

    /// When the next draft becomes due, if any
    pub fn next_flush_deadline(&self) -> Option<Instant> {
        self.drafts.next_deadline()
    }

    /// Write everything still buffered, e.g. on shutdown
    pub fn drain_drafts(&mut self) -> usize {
        let pending = self.drafts.drain();
        self.write_drafts(pending, None)
    }

    fn write_drafts(&mut self, drafts: Vec<(DraftKey, EntryEdit)>, retry_from: Option<Instant>) -> usize {
        let mut written = 0;
        for ((user_id, date), edit) in drafts {
            match tools::persist_edit(&self.storage, &user_id, date, &edit) {
                Ok(_) => written += 1,
                Err(err) => match retry_from {
                    Some(now) if err.is_retryable() => {
                        tracing::warn!("Draft for {} on {} not saved, will retry: {}", user_id, date, err);
                        self.drafts.restore((user_id, date), edit, now);
                    }
                    _ => tracing::warn!("Dropping draft for {} on {}: {}", user_id, date, err),
                },
            }
        }
        written
    }

    /// Run the MCP server, handling JSON-RPC requests over stdin/stdout
    ///
    /// This method will block until stdin closes or an error occurs.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Starting MCP server...");

        // Test database connectivity
        let user = UserId::new(self.config.default_user.as_str());
        let habits = self.storage.list_habits(&user, false)?;
        tracing::info!(
            "Server started successfully, {} habits for default user {}",
            habits.len(),
            user
        );

        let mut mcp_server = mcp::McpServer::new(self);
        mcp_server.run().await
    }

    /// Get a reference to the storage layer (useful for testing)
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Number of buffered, unwritten daily entry edits
    pub fn pending_drafts(&self) -> usize {
        self.drafts.len()
    }
}

/// Decode tool arguments; a missing argument object means "all defaults"
fn decode<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(serde_json::Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

fn encode<T: Serialize>(response: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(response)?)
}
