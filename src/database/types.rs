/// Node catalog type definitions
///
/// Rows of the node database as seen by the repository and template services.
/// Nested structures (properties, workflow bodies) are stored as JSON columns.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A workflow-automation node definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    /// Fully qualified node type (e.g., "nodes-base.slack")
    pub node_type: String,
    /// Package that ships the node (e.g., "n8n-nodes-base")
    pub package_name: String,
    /// Human-readable node name
    pub display_name: String,
    pub description: String,
    /// Catalog category (e.g., "communication", "trigger", "transform")
    pub category: String,
    /// Whether the node can start a workflow
    pub is_trigger: bool,
    pub version: String,
    /// Configurable properties declared by the node
    #[serde(default)]
    pub properties: Vec<NodeProperty>,
}

/// A single configurable property of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperty {
    /// Property key used in node configuration objects
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    /// Property kind (e.g., "string", "options", "boolean")
    #[serde(rename = "type", default)]
    pub property_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub description: String,
}

/// A published workflow template built from catalog nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Node types used by the template's workflow
    pub node_types: Vec<String>,
    /// Full workflow body as JSON
    pub workflow: Value,
    /// Popularity counter used for ordering
    pub views: i64,
}

/// Filter for node listing
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    /// Only nodes in this category
    pub category: Option<String>,
    /// Only nodes from this package
    pub package_name: Option<String>,
    /// Only trigger nodes
    pub triggers_only: bool,
    /// Maximum number of rows (default 50)
    pub limit: Option<u32>,
}
