/// Nodegate: MCP server for a workflow-node catalog
///
/// This library provides the node catalog database shared by every MCP session,
/// the UI app registry that annotates tools with renderable views, and the
/// HTTP/JSON-RPC surface tying them together.

// Core configuration and setup
pub mod config;

// Node catalog storage and the process-wide shared database lifecycle
pub mod database;

// UI app bundles and tool annotation
pub mod ui;

// MCP sessions, tools, and JSON-RPC dispatch
pub mod mcp;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use database::{SharedDatabase, SharedDatabaseError, SharedResource};
pub use server::start_server;
pub use ui::UiAppRegistry;
