/// Node Catalog Database Layer
///
/// This module owns the node catalog store and its process-wide lifecycle:
/// - SQLite adapter and schema (sqlx)
/// - Node repository and workflow template queries
/// - Reference-counted shared instance used by every MCP session

// Row types for nodes and templates
pub mod types;

// SQLite connection and schema
pub mod adapter;

// Node definition queries
pub mod repository;

// Workflow template queries
pub mod templates;

// Backing-resource construction seam
pub mod connector;

// Single-flight, reference-counted shared instance
pub mod shared;

// Re-export commonly used types
pub use adapter::NodeDatabase;
pub use connector::{NodeServices, ResourceConnector, SqliteNodeConnector};
pub use repository::NodeRepository;
pub use shared::{SharedDatabase, SharedDatabaseError, SharedDatabaseState, SharedResource, SharedState};
pub use templates::TemplateService;
pub use types::{NodeFilter, NodeInfo, NodeProperty, WorkflowTemplate};
