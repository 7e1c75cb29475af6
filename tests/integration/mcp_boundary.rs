use super::*;
use pushforward::mcp::protocol::error_codes;
use pushforward::mcp::{tool_definitions, McpServer};

async fn mcp() -> (Harness, McpServer) {
    let h = harness().await;
    let storage = SqliteStorage::new(h.db_path.clone()).expect("Failed to open storage");
    let server = McpServer::new(PushForwardServer::new(storage, ServerConfig::default()));
    (h, server)
}

async fn send(server: &mut McpServer, request: Value) -> Value {
    let response = server
        .process_line(&request.to_string())
        .await
        .expect("request gets a response");
    serde_json::to_value(response).unwrap()
}

#[tokio::test]
async fn test_every_listed_tool_is_dispatched() {
    let mut h = harness().await;
    let day = ctx("alice", "2024-05-01");
    for def in tool_definitions() {
        if let Err(err) = h.server.call_tool(&def.name, json!({}), &day).await {
            assert_ne!(err.kind(), ErrorKind::UnknownTool, "{}", def.name);
        }
    }
}

#[tokio::test]
async fn test_tools_call_uses_meta_user() {
    let (_h, mut server) = mcp().await;

    let created = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {
                "name": "habit_create",
                "arguments": {"name": "Floss", "difficulty_rating": 1},
                "_meta": {"userId": "carol", "timezone": "Europe/London"}
            }
        }),
    )
    .await;
    let habit = &created["result"]["structuredContent"]["habit"];
    assert_eq!(habit["user_id"], "carol");
    assert!(created["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Floss"));

    let theirs = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "habit_list", "_meta": {"userId": "carol"}}
        }),
    )
    .await;
    assert_eq!(theirs["result"]["structuredContent"]["habits"].as_array().unwrap().len(), 1);

    let default_user = send(
        &mut server,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call", "params": {"name": "habit_list"}}),
    )
    .await;
    assert_eq!(default_user["result"]["structuredContent"]["habits"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_error_codes_by_kind() {
    let (_h, mut server) = mcp().await;

    let missing = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "tools/call",
            "params": {"name": "habit_progress", "arguments": {"habit_id": HabitId::new().to_string(), "completed": true}}
        }),
    )
    .await;
    assert_eq!(missing["error"]["code"], error_codes::NOT_FOUND);
    assert_eq!(missing["error"]["data"]["kind"], "not_found");

    let created = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 2, "method": "tools/call",
            "params": {"name": "habit_create", "arguments": {"name": "Run"}}
        }),
    )
    .await;
    let id = created["result"]["structuredContent"]["habit"]["id"].as_str().unwrap().to_string();

    let stale = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": {"name": "habit_progress", "arguments": {"habit_id": id, "completed": false}}
        }),
    )
    .await;
    assert_eq!(stale["error"]["code"], error_codes::STALE_REVERSAL);
    assert_eq!(stale["error"]["data"]["retryable"], false);

    let bad_args = send(
        &mut server,
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": {"name": "habit_progress", "arguments": {"completed": "yes"}}
        }),
    )
    .await;
    assert_eq!(bad_args["error"]["code"], error_codes::INVALID_PARAMS);

    let unknown_method = send(&mut server, json!({"jsonrpc": "2.0", "id": 5, "method": "resources/list"})).await;
    assert_eq!(unknown_method["error"]["code"], error_codes::METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_tools_list_carries_schemas() {
    let (_h, mut server) = mcp().await;
    let listed = send(&mut server, json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"})).await;
    let tools = listed["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), tool_definitions().len());

    let edit = tools.iter().find(|t| t["name"] == "daily_entry_edit").unwrap();
    assert!(edit["inputSchema"]["properties"]["habit_completions"].is_object());
}
