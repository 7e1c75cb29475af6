/// MCP server implementation that handles JSON-RPC communication
///
/// This module implements the actual MCP server that:
/// 1. Reads JSON-RPC requests from stdin
/// 2. Dispatches tool calls to the tracker
/// 3. Sends JSON-RPC responses to stdout
/// 4. Writes buffered daily entry edits once they have been quiet long enough

use schemars::JsonSchema;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::mcp::protocol::*;
use crate::tools;
use crate::{PushForwardServer, ServerError};

/// MCP server that handles communication with the client
pub struct McpServer {
    tracker: PushForwardServer,
    /// Whether the client has sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    pub fn new(tracker: PushForwardServer) -> Self {
        Self {
            tracker,
            initialized: false,
        }
    }

    pub fn tracker(&self) -> &PushForwardServer {
        &self.tracker
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the MCP server, handling JSON-RPC over stdin/stdout
    pub async fn run(&mut self) -> Result<(), ServerError> {
        info!("Starting MCP server, waiting for JSON-RPC requests...");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();

        loop {
            let deadline = self.tracker.next_flush_deadline();
            let flush_timer = async {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        if let Some(response) = self.process_line(&line).await {
                            let response_str = serde_json::to_string(&response)?;

                            // Write response + newline
                            stdout.write_all(response_str.as_bytes()).await?;
                            stdout.write_all(b"\n").await?;
                            stdout.flush().await?;

                            debug!("Sent response: {}", response_str);
                        }
                    }
                    Ok(None) => {
                        info!("MCP server shutting down (stdin closed)");
                        break;
                    }
                    Err(e) => {
                        error!("Failed to read from stdin: {}", e);
                        break;
                    }
                },
                _ = flush_timer => {
                    let written = self.tracker.flush_due_drafts(std::time::Instant::now());
                    debug!("Flushed {} buffered entries", written);
                }
            }
        }

        let written = self.tracker.drain_drafts();
        if written > 0 {
            info!("Wrote {} buffered entries before exit", written);
        }
        Ok(())
    }

    /// Process a single line of JSON-RPC input
    pub async fn process_line(&mut self, line: &str) -> Option<JsonRpcResponse> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        debug!("Processing request: {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(req) => req,
            Err(e) => {
                error!("Failed to parse JSON-RPC request: {}", e);
                return Some(JsonRpcResponse::error(
                    json!(null),
                    error_codes::PARSE_ERROR,
                    format!("Invalid JSON: {}", e),
                    None,
                ));
            }
        };

        // Notifications carry no id and get no reply
        match request.id.clone() {
            Some(id) => Some(self.handle_request(id, request).await),
            None => {
                self.handle_notification(&request.method);
                None
            }
        }
    }

    fn handle_notification(&mut self, method: &str) {
        match method {
            "notifications/initialized" | "initialized" => {
                self.initialized = true;
                info!("MCP client initialized");
            }
            other => debug!("Ignoring notification {}", other),
        }
    }

    async fn handle_request(&mut self, id: Value, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": tool_definitions() })),
            "tools/call" => self.handle_tools_call(id, request.params).await,
            _ => JsonRpcResponse::error(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method '{}' not found", request.method),
                None,
            ),
        }
    }

    fn handle_initialize(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        match params.client_info {
            Some(client) => info!("MCP client connected: {} {}", client.name, client.version),
            None => info!("MCP client connected"),
        }
        if let Some(version) = params.protocol_version.filter(|v| v != MCP_VERSION) {
            warn!("Client asked for protocol {}, answering with {}", version, MCP_VERSION);
        }

        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: "PushForward".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
        }
    }

    async fn handle_tools_call(&mut self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let call = match params.map(serde_json::from_value::<ToolCallParams>) {
            Some(Ok(call)) => call,
            Some(Err(e)) => {
                return JsonRpcResponse::error(
                    id,
                    error_codes::INVALID_PARAMS,
                    format!("Invalid parameters: {}", e),
                    None,
                );
            }
            None => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing parameters".to_string(), None);
            }
        };

        let ctx = self
            .tracker
            .context(call.meta.user_id.as_deref(), call.meta.timezone.as_deref());

        match self
            .tracker
            .call_tool(&call.name, Value::Object(call.arguments), &ctx)
            .await
        {
            Ok(structured) => {
                let text = structured
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Done")
                    .to_string();
                match serde_json::to_value(ToolCallResult::success(text, structured)) {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string(), None),
                }
            }
            Err(err) => {
                warn!("Tool {} failed for {}: {}", call.name, ctx.user_id, err);
                JsonRpcResponse::tool_error(id, &err)
            }
        }
    }
}

fn tool<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let input_schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}));
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

/// Every tool the server answers to, with schemas derived from the parameter types
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool::<tools::CreateHabitParams>(
            "habit_create",
            "Create a new habit. Leave out the name to take a suggestion; set auto_rate to let the coach rate its difficulty",
        ),
        tool::<tools::UpdateHabitParams>(
            "habit_update",
            "Rename, re-tag, pause or re-rate a habit. Changing the difficulty rescales its experience",
        ),
        tool::<tools::DeleteHabitParams>("habit_delete", "Delete a habit with its subtasks (needs confirm: true)"),
        tool::<tools::ListHabitsParams>(
            "habit_list",
            "List habits with level, tier, experience and streaks. Also applies missed-day decay",
        ),
        tool::<tools::HabitProgressParams>(
            "habit_progress",
            "Mark a habit done (or undo it) for today. Grants experience, levels, tiers and badges",
        ),
        tool::<tools::LevelUpParams>(
            "habit_level_up",
            "Apply a pending level-up when the habit has enough experience",
        ),
        tool::<tools::AnalyzeHabitParams>(
            "habit_analyze",
            "Ask the coach to rate a habit's difficulty and apply the new rating",
        ),
        tool::<tools::AddSubtaskParams>("subtask_add", "Add a checklist step to a habit"),
        tool::<tools::RemoveSubtaskParams>("subtask_remove", "Remove a checklist step from a habit"),
        tool::<tools::DailyEntryParams>(
            "daily_entry_get",
            "Show a day's journal entry, including unsaved edits",
        ),
        tool::<tools::EditEntryParams>(
            "daily_entry_edit",
            "Edit a day's entry. Edits are buffered and saved after a short quiet period",
        ),
        tool::<tools::EditEntryParams>("daily_entry_save", "Save a day's entry immediately"),
        tool::<tools::DailyEntryParams>("daily_entry_finalize", "Lock a day's entry against further edits"),
        tool::<tools::CreateGoalParams>(
            "goal_create",
            "Set a daily, weekly or monthly completion target for an attribute",
        ),
        tool::<tools::GoalProgressParams>("goal_progress", "Show progress towards every goal"),
        tool::<tools::WeeklyReviewParams>(
            "weekly_review",
            "Summarize the last seven days with insights, streak and achievements",
        ),
        tool::<tools::SuggestionsParams>("habit_suggestions", "Suggest new habits to try"),
        tool::<tools::ChatParams>("chat", "Talk to the habit coach"),
        tool::<tools::ResetParams>("user_reset", "Delete all of the caller's data (needs confirm: true)"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ServerConfig, SqliteStorage};

    fn server() -> McpServer {
        let storage = SqliteStorage::in_memory().unwrap();
        McpServer::new(PushForwardServer::new(storage, ServerConfig::default()))
    }

    #[tokio::test]
    async fn test_handshake_and_notifications() {
        let mut server = server();
        let init = server
            .process_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","clientInfo":{"name":"t","version":"1"}}}"#)
            .await
            .unwrap();
        let result = init.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], "PushForward");

        let none = server
            .process_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(none.is_none());
        assert!(server.is_initialized());

        let bad = server.process_line("{not json").await.unwrap();
        assert_eq!(bad.error.unwrap().code, error_codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn test_tools_call_errors_are_json_rpc_errors() {
        let mut server = server();
        let unknown = server
            .process_line(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"habit_fly"}}"#)
            .await
            .unwrap();
        assert_eq!(unknown.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

        let bad_date = server
            .process_line(r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"daily_entry_get","arguments":{"date":"2024-13-40"}}}"#)
            .await
            .unwrap();
        let error = bad_date.error.unwrap();
        assert_eq!(error.code, error_codes::INVALID_PARAMS);
        assert_eq!(error.data.unwrap()["retryable"], false);

        let ok = server
            .process_line(r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"habit_list","arguments":{}}}"#)
            .await
            .unwrap();
        let result = ok.result.unwrap();
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["success"], true);
    }

    #[test]
    fn test_tool_definitions_are_unique_objects() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 19);

        let mut names: Vec<&str> = defs.iter().map(|d| d.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), defs.len());

        for def in &defs {
            assert_eq!(def.input_schema["type"], "object", "{}", def.name);
        }
    }

    #[test]
    fn test_progress_schema_requires_habit_id() {
        let defs = tool_definitions();
        let progress = defs.iter().find(|d| d.name == "habit_progress").unwrap();
        let required = progress.input_schema["required"].as_array().unwrap();
        assert!(required.iter().any(|r| r == "habit_id"));
    }
}
