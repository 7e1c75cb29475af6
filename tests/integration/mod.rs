/// Integration tests driving the server through its tool surface
use pushforward::*;
use serde_json::{json, Value};
use tempfile::TempDir;

mod daily_entries;
mod habits;
mod mcp_boundary;
mod timezones;

/// A server over a database file that lives as long as the harness
pub struct Harness {
    _dir: TempDir,
    pub db_path: std::path::PathBuf,
    pub server: PushForwardServer,
}

pub async fn harness_with(config: ServerConfig) -> Harness {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("pushforward.db");
    let server = PushForwardServer::open(db_path.clone(), config)
        .await
        .expect("Failed to create server");
    Harness {
        _dir: dir,
        db_path,
        server,
    }
}

pub async fn harness() -> Harness {
    harness_with(ServerConfig::default()).await
}

/// Context for `user` pinned to `day` in UTC
pub fn ctx(user: &str, day: &str) -> RequestContext {
    RequestContext::on(UserId::new(user), chrono_tz::Tz::UTC, DateKey::parse(day).unwrap())
}

impl Harness {
    pub async fn call(&mut self, name: &str, arguments: Value, ctx: &RequestContext) -> Value {
        self.server
            .call_tool(name, arguments, ctx)
            .await
            .unwrap_or_else(|e| panic!("{} failed: {}", name, e))
    }

    pub async fn call_err(&mut self, name: &str, arguments: Value, ctx: &RequestContext) -> ToolError {
        match self.server.call_tool(name, arguments, ctx).await {
            Ok(value) => panic!("{} unexpectedly succeeded: {}", name, value),
            Err(e) => e,
        }
    }

    /// Create a habit and return its id
    pub async fn create_habit(&mut self, name: &str, difficulty: u8, ctx: &RequestContext) -> String {
        let created = self
            .call(
                "habit_create",
                json!({"name": name, "difficulty_rating": difficulty, "tags": ["STR"]}),
                ctx,
            )
            .await;
        created["habit"]["id"].as_str().expect("habit id").to_string()
    }
}
