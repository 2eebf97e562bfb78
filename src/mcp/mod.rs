/// MCP Protocol Layer
///
/// JSON-RPC surface of the node catalog:
/// - Session tracking, one shared-database reference per session
/// - Tool definitions and execution
/// - Argument coercion for clients that stringify structured params
/// - Method dispatch with UI metadata injection

pub mod session;

pub mod coerce;

pub mod tools;

pub mod handler;

// Re-export commonly used types
pub use handler::{JsonRpcRequest, JsonRpcResponse, McpHandler};
pub use session::{Session, SessionManager};
pub use tools::{tool_definitions, ToolDefinition, ToolError};
