/// Nodegate: MCP server for a workflow-node catalog
///
/// Main entry point. Loads configuration from the environment and starts the
/// HTTP server.

use nodegate::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - MCP JSON-RPC endpoint at /mcp (POST for messages, DELETE to end a session)
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration (defaults to 0.0.0.0:3010 and data/nodes.db)
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
