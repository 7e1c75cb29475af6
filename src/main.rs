/// Main entry point for the PushForward MCP server
///
/// This file sets up logging, parses command line arguments, and starts the MCP server.
/// The server listens for JSON-RPC requests over stdin/stdout following the MCP protocol.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use pushforward::{PushForwardServer, ServerConfig};

/// Get the default database path with robust fallback strategy
fn get_default_database_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    // Try various locations in order of preference
    let potential_paths = [
        dirs::home_dir().map(|p| p.join(".pushforward")),
        dirs::data_dir().map(|p| p.join("pushforward")),
        dirs::config_dir().map(|p| p.join("pushforward")),
        std::env::current_dir().ok().map(|p| p.join(".pushforward")),
    ];

    for potential_path in potential_paths.iter().flatten() {
        if std::fs::create_dir_all(potential_path).is_ok() {
            // Test if we can write to this directory
            let test_file = potential_path.join(".test_write");
            if std::fs::write(&test_file, "test").is_ok() {
                let _ = std::fs::remove_file(&test_file);
                return Ok(potential_path.join("pushforward.db"));
            }
        }
    }

    // Ultimate fallback: use a temporary directory
    let temp_path = std::env::temp_dir().join("pushforward");
    std::fs::create_dir_all(&temp_path)?;
    let db_path = temp_path.join("pushforward.db");

    tracing::warn!("Using temporary directory for database: {}", db_path.display());
    Ok(db_path)
}

/// Command line arguments for the PushForward MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = "PUSHFORWARD_DATABASE")]
    database: Option<PathBuf>,

    /// User id for calls that don't carry `_meta.userId`
    #[arg(long, env = "PUSHFORWARD_USER", default_value = "local")]
    user: String,

    /// IANA timezone for calls that don't carry `_meta.timezone`
    #[arg(long, env = "PUSHFORWARD_TIMEZONE", default_value = "UTC")]
    timezone: String,

    /// Quiet period before buffered daily entry edits are saved
    #[arg(long, env = "PUSHFORWARD_DEBOUNCE_MS", default_value_t = 1500)]
    debounce_ms: u64,

    /// How long generated coach text is reused
    #[arg(long, env = "PUSHFORWARD_AI_CACHE_TTL_SECS", default_value_t = 300)]
    ai_cache_ttl_secs: u64,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let log_level = if args.verbose {
        "debug"
    } else if args.debug {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!("pushforward={}", log_level))
        .with_writer(std::io::stderr) // stdout carries the protocol
        .init();

    info!("Starting PushForward MCP server");

    let db_path = match args.database {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            path
        }
        None => get_default_database_path()?,
    };

    info!("Using database at: {}", db_path.display());

    let config = ServerConfig {
        default_user: args.user,
        default_timezone: args.timezone,
        debounce: Duration::from_millis(args.debounce_ms),
        ai_cache_ttl: Duration::from_secs(args.ai_cache_ttl_secs),
        ..ServerConfig::default()
    };

    let server = PushForwardServer::open(db_path, config).await?;
    server.run().await?;

    info!("PushForward MCP server shutdown complete");
    Ok(())
}
