/// JSON-RPC dispatch for MCP requests
///
/// Handles every method except `initialize`, which the HTTP layer answers
/// because it creates the session. Requests run against the node services
/// held by the caller's session.

use crate::database::NodeServices;
use crate::mcp::{
    coerce::coerce_stringified_params,
    tools::{call_tool, find_tool, tool_definitions, ToolError},
};
use crate::ui::UiAppRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;

pub const PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i64 = -32700;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const RESOURCE_NOT_FOUND: i64 = -32002;
pub const SESSION_NOT_FOUND: i64 = -32001;
pub const INTERNAL_ERROR: i64 = -32603;

/// Incoming JSON-RPC message; requests without an id are notifications
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
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

    pub fn failure(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Result body for `initialize`
pub fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": false },
            "resources": { "listChanged": false }
        },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Dispatches session-scoped MCP methods
#[derive(Debug, Clone)]
pub struct McpHandler {
    registry: Arc<UiAppRegistry>,
}

impl McpHandler {
    pub fn new(registry: Arc<UiAppRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one request against the session's node services
    pub async fn dispatch(&self, services: &NodeServices, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone().unwrap_or(Value::Null);
        let params = request.params.unwrap_or(Value::Null);

        tracing::debug!(method = %request.method, "Dispatching MCP request");

        match request.method.as_str() {
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, self.list_tools()),
            "tools/call" => self.call(services, id, params).await,
            "resources/list" => JsonRpcResponse::success(
                id,
                json!({ "resources": self.registry.list_resources() }),
            ),
            "resources/read" => {
                let Some(uri) = params.get("uri").and_then(Value::as_str) else {
                    return JsonRpcResponse::failure(id, INVALID_PARAMS, "uri is required");
                };
                match self.registry.read_resource(uri) {
                    Some(content) => JsonRpcResponse::success(id, json!({ "contents": [content] })),
                    None => JsonRpcResponse::failure(id, RESOURCE_NOT_FOUND, format!("Resource not found: {}", uri)),
                }
            }
            other => JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("Method not found: {}", other)),
        }
    }

    /// Tool definitions annotated with UI metadata
    pub fn list_tools(&self) -> Value {
        let mut tools = tool_definitions();
        self.registry.inject_tool_meta(&mut tools);
        json!({ "tools": tools })
    }

    async fn call(&self, services: &NodeServices, id: Value, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "name is required");
        };
        let Some(definition) = find_tool(name) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {}", name));
        };

        let args = match params.get("arguments") {
            None | Some(Value::Null) => Map::new(),
            Some(Value::Object(args)) => args.clone(),
            Some(_) => return JsonRpcResponse::failure(id, INVALID_PARAMS, "arguments must be an object"),
        };
        let args = coerce_stringified_params(&definition.input_schema, args);

        match call_tool(services, name, &args).await {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": text }],
                        "structuredContent": result,
                    }),
                )
            }
            Err(ToolError::UnknownTool(name)) => {
                JsonRpcResponse::failure(id, INVALID_PARAMS, format!("Unknown tool: {}", name))
            }
            Err(e) => {
                if matches!(e, ToolError::Storage(_)) {
                    tracing::error!(tool = name, "Tool call failed: {}", e);
                }
                JsonRpcResponse::success(
                    id,
                    json!({
                        "content": [{ "type": "text", "text": e.to_string() }],
                        "isError": true,
                    }),
                )
            }
        }
    }
}
