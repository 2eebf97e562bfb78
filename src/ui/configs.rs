/// Built-in UI app configuration
///
/// The list-style apps (workflow list, execution history, health dashboard) are
/// not shipped: hosts currently collapse them instead of rendering.

use crate::ui::types::UiAppConfig;

/// MIME type hosts expect for MCP app bundles
pub const MCP_APP_MIME_TYPE: &str = "text/html;profile=mcp-app";

/// Apps served by default
pub fn default_app_configs() -> Vec<UiAppConfig> {
    vec![
        app(
            "operation-result",
            "Operation Result",
            "Visual summary of workflow operations (create, update, delete, test)",
            &[
                "n8n_create_workflow",
                "n8n_update_full_workflow",
                "n8n_update_partial_workflow",
                "n8n_delete_workflow",
                "n8n_test_workflow",
                "n8n_autofix_workflow",
            ],
        ),
        app(
            "validation-summary",
            "Validation Summary",
            "Visual summary of node and workflow validation results",
            &["validate_node", "validate_workflow", "n8n_validate_workflow"],
        ),
    ]
}

fn app(id: &str, display_name: &str, description: &str, tool_patterns: &[&str]) -> UiAppConfig {
    UiAppConfig {
        id: id.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        uri: format!("ui://nodegate/{}", id),
        mime_type: MCP_APP_MIME_TYPE.to_string(),
        tool_patterns: tool_patterns.iter().map(|p| p.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_configs_have_unique_ids_and_patterns() {
        let configs = default_app_configs();

        let ids: HashSet<_> = configs.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), configs.len());

        let patterns: Vec<_> = configs.iter().flat_map(|c| c.tool_patterns.iter()).collect();
        let unique: HashSet<_> = patterns.iter().collect();
        assert_eq!(unique.len(), patterns.len());
    }

    #[test]
    fn test_uri_derived_from_id() {
        for config in default_app_configs() {
            assert_eq!(config.uri, format!("ui://nodegate/{}", config.id));
            assert_eq!(config.mime_type, MCP_APP_MIME_TYPE);
        }
    }
}
