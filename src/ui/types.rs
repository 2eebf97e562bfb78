/// UI app type definitions
///
/// A UI app is a bundled HTML view a host can render for the results of
/// specific tools. Configuration is static; the HTML payload is loaded from disk.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Static description of one UI app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiAppConfig {
    /// App identifier, also the bundle directory name (e.g., "operation-result")
    pub id: String,
    pub display_name: String,
    pub description: String,
    /// Resource URI hosts fetch the app from (e.g., "ui://nodegate/operation-result")
    pub uri: String,
    pub mime_type: String,
    /// Tool names whose results this app renders
    pub tool_patterns: Vec<String>,
}

/// A configured app paired with its loaded HTML
///
/// `html` is None when the bundle is missing or unreadable.
#[derive(Debug, Clone, PartialEq)]
pub struct UiAppEntry {
    pub config: UiAppConfig,
    pub html: Option<String>,
}

/// Listing view of a servable UI app
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiResource {
    pub uri: String,
    pub name: String,
    pub description: String,
    pub mime_type: String,
}

/// Contents of a UI app resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UiResourceContent {
    pub uri: String,
    pub mime_type: String,
    pub text: String,
}

/// Anything carrying a tool name and an extensible `_meta` slot
pub trait ToolMetaTarget {
    fn tool_name(&self) -> &str;
    fn set_meta(&mut self, meta: Value);
}

/// JSON tool objects (`{"name": ..., ...}`) as produced by protocol glue
impl ToolMetaTarget for Value {
    fn tool_name(&self) -> &str {
        self.get("name").and_then(Value::as_str).unwrap_or_default()
    }

    fn set_meta(&mut self, meta: Value) {
        if let Some(object) = self.as_object_mut() {
            object.insert("_meta".to_string(), meta);
        }
    }
}

/// Presentation metadata pointing a host at a UI resource
///
/// Carries both the nested and the flat key since hosts read either.
pub fn ui_meta(resource_uri: &str) -> Value {
    json!({
        "ui": { "resourceUri": resource_uri },
        "ui/resourceUri": resource_uri,
    })
}
