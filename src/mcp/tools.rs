/// Node catalog tools exposed over MCP
///
/// Tool definitions (name, description, JSON input schema) and their execution
/// against the shared node services.

use crate::database::{NodeFilter, NodeServices};
use crate::ui::ToolMetaTarget;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const DEFAULT_TEMPLATE_LIMIT: u32 = 10;

/// A tool as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
    /// Presentation metadata attached by the UI app registry
    #[serde(rename = "_meta", default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl ToolMetaTarget for ToolDefinition {
    fn tool_name(&self) -> &str {
        &self.name
    }

    fn set_meta(&mut self, meta: Value) {
        self.meta = Some(meta);
    }
}

/// Failures of a single tool call
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
        meta: None,
    }
}

/// Every tool this server offers, in listing order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "search_nodes",
            "Search workflow nodes by keyword across type, name and description",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search keyword" },
                    "limit": { "type": "number", "description": "Maximum results (default 20)" }
                },
                "required": ["query"]
            }),
        ),
        tool(
            "get_node",
            "Get the full definition of a node, including its configurable properties",
            json!({
                "type": "object",
                "properties": {
                    "nodeType": { "type": "string", "description": "Fully qualified node type, e.g. nodes-base.slack" }
                },
                "required": ["nodeType"]
            }),
        ),
        tool(
            "list_nodes",
            "List catalog nodes, optionally filtered by category, package or trigger capability",
            json!({
                "type": "object",
                "properties": {
                    "category": { "type": "string" },
                    "package": { "type": "string" },
                    "triggersOnly": { "type": "boolean" },
                    "limit": { "type": "number" }
                }
            }),
        ),
        tool(
            "list_node_templates",
            "List the most popular workflow templates that use a node",
            json!({
                "type": "object",
                "properties": {
                    "nodeType": { "type": "string" },
                    "limit": { "type": "number" }
                },
                "required": ["nodeType"]
            }),
        ),
        tool(
            "search_templates",
            "Search workflow templates by keyword in name and description",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "number" }
                },
                "required": ["query"]
            }),
        ),
        tool(
            "get_template",
            "Get a workflow template with its full workflow body",
            json!({
                "type": "object",
                "properties": {
                    "templateId": { "type": "integer" }
                },
                "required": ["templateId"]
            }),
        ),
        tool(
            "validate_node",
            "Check a node configuration against the node's declared properties",
            json!({
                "type": "object",
                "properties": {
                    "nodeType": { "type": "string" },
                    "config": { "type": "object" }
                },
                "required": ["nodeType", "config"]
            }),
        ),
    ]
}

/// Definition of a single tool by name
pub fn find_tool(name: &str) -> Option<ToolDefinition> {
    tool_definitions().into_iter().find(|t| t.name == name)
}

/// Execute a tool against the shared node services
pub async fn call_tool(services: &NodeServices, name: &str, args: &Map<String, Value>) -> Result<Value, ToolError> {
    match name {
        "search_nodes" => {
            let query = required_str(args, "query")?;
            let limit = optional_u32(args, "limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
            let nodes = services.repository.search_nodes(query, limit).await?;
            Ok(json!({ "query": query, "totalCount": nodes.len(), "results": nodes }))
        }
        "get_node" => {
            let node_type = required_str(args, "nodeType")?;
            match services.repository.get_node(node_type).await? {
                Some(node) => Ok(serde_json::to_value(node).map_err(anyhow::Error::from)?),
                None => Err(ToolError::NotFound(format!("Node not found: {}", node_type))),
            }
        }
        "list_nodes" => {
            let filter = NodeFilter {
                category: optional_str(args, "category")?.map(str::to_string),
                package_name: optional_str(args, "package")?.map(str::to_string),
                triggers_only: optional_bool(args, "triggersOnly")?.unwrap_or(false),
                limit: optional_u32(args, "limit")?,
            };
            let nodes = services.repository.list_nodes(&filter).await?;
            Ok(json!({ "totalCount": nodes.len(), "nodes": nodes }))
        }
        "list_node_templates" => {
            let node_type = required_str(args, "nodeType")?;
            let limit = optional_u32(args, "limit")?.unwrap_or(DEFAULT_TEMPLATE_LIMIT);
            let templates = services.templates.list_templates_for_node(node_type, limit).await?;
            Ok(json!({ "nodeType": node_type, "templates": templates }))
        }
        "search_templates" => {
            let query = required_str(args, "query")?;
            let limit = optional_u32(args, "limit")?.unwrap_or(DEFAULT_TEMPLATE_LIMIT);
            let templates = services.templates.search_templates(query, limit).await?;
            Ok(json!({ "query": query, "totalCount": templates.len(), "templates": templates }))
        }
        "get_template" => {
            let id = args
                .get("templateId")
                .and_then(Value::as_i64)
                .ok_or_else(|| ToolError::InvalidArguments("templateId must be an integer".to_string()))?;
            match services.templates.get_template(id).await? {
                Some(template) => Ok(serde_json::to_value(template).map_err(anyhow::Error::from)?),
                None => Err(ToolError::NotFound(format!("Template not found: {}", id))),
            }
        }
        "validate_node" => {
            let node_type = required_str(args, "nodeType")?;
            let config = args
                .get("config")
                .and_then(Value::as_object)
                .ok_or_else(|| ToolError::InvalidArguments("config must be an object".to_string()))?;
            validate_node(services, node_type, config).await
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

/// A config is valid when it names only declared properties and sets every required one
async fn validate_node(services: &NodeServices, node_type: &str, config: &Map<String, Value>) -> Result<Value, ToolError> {
    let Some(node) = services.repository.get_node(node_type).await? else {
        return Ok(json!({
            "nodeType": node_type,
            "valid": false,
            "errors": [format!("Unknown node type: {}", node_type)],
        }));
    };

    let unknown = config
        .keys()
        .filter(|key| !node.properties.iter().any(|p| &p.name == *key))
        .map(|key| format!("Unknown property: {}", key));

    let missing = node
        .properties
        .iter()
        .filter(|p| p.required && !config.contains_key(&p.name))
        .map(|p| format!("Missing required property: {}", p.name));

    let errors: Vec<String> = unknown.chain(missing).collect();

    Ok(json!({
        "nodeType": node_type,
        "valid": errors.is_empty(),
        "errors": errors,
    }))
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolError> {
    optional_str(args, key)?.ok_or_else(|| ToolError::InvalidArguments(format!("{} is required", key)))
}

fn optional_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::InvalidArguments(format!("{} must be a string", key))),
    }
}

fn optional_u32(args: &Map<String, Value>, key: &str) -> Result<Option<u32>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("{} must be a non-negative integer", key))),
    }
}

fn optional_bool(args: &Map<String, Value>, key: &str) -> Result<Option<bool>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(ToolError::InvalidArguments(format!("{} must be a boolean", key))),
    }
}
