/// MCP (Model Context Protocol) message structures and JSON-RPC handling
///
/// This module defines the JSON-RPC message format that MCP clients use to
/// talk to the tracker, and the mapping from tool errors to error codes.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::tools::{ErrorKind, ToolError};

/// MCP protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request message
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Absent for notifications, which get no response
    #[serde(default)]
    pub id: Option<Value>,
    /// The method to call (e.g., "tools/call")
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Per-call metadata supplied by whatever sits in front of the server
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMeta {
    /// Authenticated user; the server's default user when absent
    pub user_id: Option<String>,
    /// IANA timezone of the client, e.g. "America/Los_Angeles"
    pub timezone: Option<String>,
}

/// MCP tool call parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "habit_progress")
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
    #[serde(rename = "_meta", default)]
    pub meta: RequestMeta,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Human readable summary
    pub content: Vec<ToolContent>,
    /// The full typed response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    pub is_error: bool,
}

/// Content returned by a tool
#[derive(Debug, Serialize)]
pub struct ToolContent {
    /// Type of content (usually "text")
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tool definition
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// MCP initialization request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializeParams {
    pub protocol_version: Option<String>,
    pub client_info: Option<ClientInfo>,
}

/// Information about the MCP client
#[derive(Debug, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// MCP initialization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

// JSON-RPC error codes
pub mod error_codes {
    /// Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// The requested method (or tool) doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Parameters failed validation, including malformed date keys
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    // Application-specific codes live in -32000 to -32099
    /// A habit, subtask or other row doesn't exist for this user
    pub const NOT_FOUND: i32 = -32001;
    /// Un-checking a completion whose day has moved on
    pub const STALE_REVERSAL: i32 = -32002;
    /// Database unavailable; the call may be retried
    pub const STORAGE_ERROR: i32 = -32004;
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }

    /// Error response for a failed tool call
    pub fn tool_error(id: Value, error: &ToolError) -> Self {
        let kind = error.kind();
        Self::error(
            id,
            error_code(kind),
            error.to_string(),
            Some(json!({
                "kind": kind,
                "retryable": error.is_retryable(),
            })),
        )
    }
}

/// Transport code for each error class
pub fn error_code(kind: ErrorKind) -> i32 {
    match kind {
        ErrorKind::Validation => error_codes::INVALID_PARAMS,
        ErrorKind::NotFound => error_codes::NOT_FOUND,
        ErrorKind::StaleReversal => error_codes::STALE_REVERSAL,
        ErrorKind::StorageUnavailable => error_codes::STORAGE_ERROR,
        ErrorKind::UnknownTool => error_codes::METHOD_NOT_FOUND,
        ErrorKind::Internal => error_codes::INTERNAL_ERROR,
    }
}

impl ToolCallResult {
    /// A successful result: the message as text plus the full response
    pub fn success(text: String, structured: Value) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            structured_content: Some(structured),
            is_error: false,
        }
    }
}
