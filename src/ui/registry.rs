/// Hot-reload UI app registry using ArcSwap
///
/// Maps app ids and tool names to UI app entries. Every load builds a fresh
/// index and swaps it in atomically, so readers never see a half-built map and
/// no entry from an earlier load survives a reload.

use crate::ui::{
    source::PayloadSource,
    types::{ui_meta, ToolMetaTarget, UiAppConfig, UiAppEntry, UiResource, UiResourceContent},
};
use arc_swap::ArcSwapOption;
use std::{collections::HashMap, fmt, sync::Arc};

/// Load-once registry of UI apps, indexed by id and by tool name
///
/// Before the first `load` every lookup reports "not found".
pub struct UiAppRegistry {
    /// Static app configuration, in listing order
    configs: Vec<UiAppConfig>,

    /// Where app HTML is read from
    source: Arc<dyn PayloadSource>,

    /// Current index; None until loaded (and again after reset)
    index: ArcSwapOption<RegistryIndex>,
}

/// Immutable snapshot built by one load pass
#[derive(Debug, Default)]
struct RegistryIndex {
    entries: Vec<Arc<UiAppEntry>>,
    by_id: HashMap<String, Arc<UiAppEntry>>,
    by_tool: HashMap<String, Arc<UiAppEntry>>,
}

impl UiAppRegistry {
    /// Create an unloaded registry
    pub fn new(configs: Vec<UiAppConfig>, source: Arc<dyn PayloadSource>) -> Self {
        Self {
            configs,
            source,
            index: ArcSwapOption::empty(),
        }
    }

    /// Read every app's HTML and rebuild both indices
    ///
    /// Never fails: a missing bundle or a read error leaves that entry without HTML.
    /// Safe to call again after deploying new bundles.
    pub fn load(&self) {
        let mut index = RegistryIndex::default();

        for config in &self.configs {
            let html = if self.source.exists(&config.id) {
                match self.source.read(&config.id) {
                    Ok(html) => {
                        tracing::info!(app_id = %config.id, "Loaded UI app");
                        Some(html)
                    }
                    Err(e) => {
                        tracing::warn!(app_id = %config.id, "Failed to read UI app HTML: {}", e);
                        None
                    }
                }
            } else {
                tracing::debug!(app_id = %config.id, "UI app bundle not found");
                None
            };

            let entry = Arc::new(UiAppEntry {
                config: config.clone(),
                html,
            });

            // A reused id replaces the earlier entry, tool mappings included
            if let Some(previous) = index.by_id.get(&config.id) {
                index
                    .by_tool
                    .retain(|_, mapped| !Arc::ptr_eq(mapped, previous));
            }

            // Build tool -> entry index
            for pattern in &config.tool_patterns {
                index.by_tool.insert(pattern.clone(), Arc::clone(&entry));
            }

            match index.entries.iter().position(|e| e.config.id == config.id) {
                Some(pos) => index.entries[pos] = Arc::clone(&entry),
                None => index.entries.push(Arc::clone(&entry)),
            }
            index.by_id.insert(config.id.clone(), entry);
        }

        tracing::info!(
            "UI app registry loaded: {} apps, {} tool mappings",
            index.by_id.len(),
            index.by_tool.len()
        );

        // Atomic swap of the entire registry
        self.index.store(Some(Arc::new(index)));
    }

    pub fn is_loaded(&self) -> bool {
        self.index.load().is_some()
    }

    /// Entry whose tool patterns include `tool_name`
    pub fn get_app_for_tool(&self, tool_name: &str) -> Option<Arc<UiAppEntry>> {
        self.index.load().as_deref()?.by_tool.get(tool_name).cloned()
    }

    /// Entry with the given app id
    pub fn get_app_by_id(&self, id: &str) -> Option<Arc<UiAppEntry>> {
        self.index.load().as_deref()?.by_id.get(id).cloned()
    }

    /// All entries in configuration order (empty before load)
    pub fn get_all_apps(&self) -> Vec<Arc<UiAppEntry>> {
        self.index
            .load()
            .as_deref()
            .map(|index| index.entries.clone())
            .unwrap_or_default()
    }

    /// Stamp `_meta` UI pointers onto tool definitions in place
    ///
    /// Only tools mapped to an app whose HTML loaded are touched; everything
    /// else keeps its metadata as it was.
    pub fn inject_tool_meta<T: ToolMetaTarget>(&self, tools: &mut [T]) {
        let guard = self.index.load();
        let Some(index) = guard.as_deref() else {
            return;
        };

        for tool in tools.iter_mut() {
            let uri = match index.by_tool.get(tool.tool_name()) {
                Some(entry) if entry.html.is_some() => entry.config.uri.clone(),
                _ => continue,
            };
            tool.set_meta(ui_meta(&uri));
        }
    }

    /// Apps that can actually be served
    pub fn list_resources(&self) -> Vec<UiResource> {
        self.get_all_apps()
            .iter()
            .filter(|entry| entry.html.is_some())
            .map(|entry| UiResource {
                uri: entry.config.uri.clone(),
                name: entry.config.display_name.clone(),
                description: entry.config.description.clone(),
                mime_type: entry.config.mime_type.clone(),
            })
            .collect()
    }

    /// HTML for the app published at `uri`
    pub fn read_resource(&self, uri: &str) -> Option<UiResourceContent> {
        let guard = self.index.load();
        let entry = guard
            .as_deref()?
            .entries
            .iter()
            .find(|entry| entry.config.uri == uri)?;

        Some(UiResourceContent {
            uri: entry.config.uri.clone(),
            mime_type: entry.config.mime_type.clone(),
            text: entry.html.clone()?,
        })
    }

    /// Drop all entries and the loaded flag (test isolation)
    pub fn reset(&self) {
        self.index.store(None);
    }
}

impl fmt::Debug for UiAppRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiAppRegistry")
            .field("configs", &self.configs.len())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ui::configs::default_app_configs;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory payload source; absent ids do not exist, `Err` payloads fail to read
    #[derive(Default)]
    pub(crate) struct MockSource {
        payloads: Mutex<HashMap<String, Result<String, String>>>,
        exists_calls: AtomicUsize,
        read_calls: AtomicUsize,
    }

    impl MockSource {
        pub(crate) fn set_all(&self, html: &str) {
            let mut payloads = self.payloads.lock();
            for config in default_app_configs() {
                payloads.insert(config.id, Ok(html.to_string()));
            }
        }

        pub(crate) fn set(&self, id: &str, payload: Result<&str, &str>) {
            self.payloads
                .lock()
                .insert(id.to_string(), payload.map(str::to_string).map_err(str::to_string));
        }

        pub(crate) fn clear(&self) {
            self.payloads.lock().clear();
        }
    }

    impl PayloadSource for MockSource {
        fn exists(&self, app_id: &str) -> bool {
            self.exists_calls.fetch_add(1, Ordering::SeqCst);
            self.payloads.lock().contains_key(app_id)
        }

        fn read(&self, app_id: &str) -> io::Result<String> {
            self.read_calls.fetch_add(1, Ordering::SeqCst);
            match self.payloads.lock().get(app_id) {
                Some(Ok(html)) => Ok(html.clone()),
                Some(Err(message)) => Err(io::Error::new(io::ErrorKind::PermissionDenied, message.clone())),
                None => Err(io::Error::from(io::ErrorKind::NotFound)),
            }
        }
    }

    fn registry() -> (UiAppRegistry, Arc<MockSource>) {
        let source = Arc::new(MockSource::default());
        let registry = UiAppRegistry::new(default_app_configs(), source.clone());
        (registry, source)
    }

    fn tool(name: &str) -> Value {
        json!({ "name": name, "description": "tool", "inputSchema": { "type": "object", "properties": {} } })
    }

    #[test]
    fn test_load_with_all_payloads() {
        let (registry, source) = registry();
        source.set_all("<html>test</html>");

        registry.load();

        let apps = registry.get_all_apps();
        assert_eq!(apps.len(), default_app_configs().len());
        assert!(apps.iter().all(|app| app.html.as_deref() == Some("<html>test</html>")));
    }

    #[test]
    fn test_load_with_missing_payloads() {
        let (registry, source) = registry();

        registry.load();

        let apps = registry.get_all_apps();
        assert_eq!(apps.len(), default_app_configs().len());
        assert!(apps.iter().all(|app| app.html.is_none()));
        assert_eq!(source.exists_calls.load(Ordering::SeqCst), default_app_configs().len());
        assert_eq!(source.read_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_load_with_read_errors() {
        let (registry, source) = registry();
        for config in default_app_configs() {
            source.set(&config.id, Err("Permission denied"));
        }

        registry.load();

        let apps = registry.get_all_apps();
        assert_eq!(apps.len(), default_app_configs().len());
        assert!(apps.iter().all(|app| app.html.is_none()));
    }

    #[test]
    fn test_load_with_partial_payloads() {
        let (registry, source) = registry();
        source.set("operation-result", Ok("<html>op</html>"));

        registry.load();

        assert_eq!(registry.get_all_apps().len(), 2);
        assert_eq!(
            registry.get_app_by_id("operation-result").unwrap().html.as_deref(),
            Some("<html>op</html>")
        );
        assert!(registry.get_app_by_id("validation-summary").unwrap().html.is_none());
    }

    #[test]
    fn test_empty_payload_is_still_a_payload() {
        let (registry, source) = registry();
        source.set_all("");

        registry.load();

        assert_eq!(registry.get_app_by_id("operation-result").unwrap().html.as_deref(), Some(""));
    }

    #[test]
    fn test_reload_replaces_previous_entries() {
        let (registry, source) = registry();
        source.set_all("<html>first</html>");
        registry.load();
        assert_eq!(
            registry.get_app_by_id("operation-result").unwrap().html.as_deref(),
            Some("<html>first</html>")
        );

        source.clear();
        registry.load();

        assert!(registry.get_app_by_id("operation-result").unwrap().html.is_none());
        assert!(registry.get_all_apps().iter().all(|app| app.html.is_none()));
    }

    #[test]
    fn test_lookups_before_load() {
        let (registry, _source) = registry();

        assert!(!registry.is_loaded());
        assert!(registry.get_all_apps().is_empty());
        assert!(registry.get_app_by_id("operation-result").is_none());
        assert!(registry.get_app_for_tool("n8n_create_workflow").is_none());
    }

    #[test]
    fn test_every_tool_pattern_resolves_to_its_app() {
        let (registry, source) = registry();
        source.set_all("<html>app</html>");
        registry.load();

        for config in default_app_configs() {
            for pattern in &config.tool_patterns {
                let entry = registry.get_app_for_tool(pattern).unwrap();
                assert_eq!(entry.config.id, config.id);
            }
        }
        assert!(registry.get_app_for_tool("n8n_deploy_template").is_none());
        assert!(registry.get_app_for_tool("n8n_list_workflows").is_none());
        assert!(registry.get_app_for_tool("").is_none());
        assert!(registry.get_app_by_id("").is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_one_entry() {
        let source = Arc::new(MockSource::default());
        let mut configs = default_app_configs();
        let mut duplicate = configs[0].clone();
        duplicate.display_name = "Replacement".to_string();
        duplicate.tool_patterns = vec!["only_new".to_string()];
        configs.push(duplicate);
        let registry = UiAppRegistry::new(configs, source);

        registry.load();

        assert_eq!(registry.get_all_apps().len(), 2);
        assert_eq!(registry.get_app_by_id("operation-result").unwrap().config.display_name, "Replacement");
        assert_eq!(registry.get_all_apps()[0].config.display_name, "Replacement");

        let by_tool = registry.get_app_for_tool("only_new").unwrap();
        let by_id = registry.get_app_by_id("operation-result").unwrap();
        assert!(Arc::ptr_eq(&by_tool, &by_id));
        assert!(registry.get_app_for_tool("n8n_create_workflow").is_none());
        assert!(registry.get_app_for_tool("validate_node").is_some());
    }

    #[test]
    fn test_inject_meta_on_mixed_list() {
        let (registry, source) = registry();
        source.set("operation-result", Ok("<html>op</html>"));
        registry.load();

        let mut tools = vec![
            tool("n8n_create_workflow"),
            tool("validate_node"),
            tool("get_node"),
        ];
        registry.inject_tool_meta(&mut tools);

        assert_eq!(
            tools[0]["_meta"],
            json!({
                "ui": { "resourceUri": "ui://nodegate/operation-result" },
                "ui/resourceUri": "ui://nodegate/operation-result",
            })
        );
        // validation-summary has no HTML
        assert!(tools[1].get("_meta").is_none());
        assert!(tools[2].get("_meta").is_none());
    }

    #[test]
    fn test_inject_meta_before_load_is_noop() {
        let (registry, _source) = registry();
        let mut tools = vec![tool("n8n_create_workflow")];

        registry.inject_tool_meta(&mut tools);

        assert!(tools[0].get("_meta").is_none());
    }

    #[test]
    fn test_inject_meta_on_empty_list() {
        let (registry, source) = registry();
        source.set_all("<html>ui</html>");
        registry.load();

        let mut tools: Vec<Value> = Vec::new();
        registry.inject_tool_meta(&mut tools);

        assert!(tools.is_empty());
    }

    #[test]
    fn test_resources_only_list_loaded_apps() {
        let (registry, source) = registry();
        source.set("validation-summary", Ok("<html>v</html>"));
        registry.load();

        let resources = registry.list_resources();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, "ui://nodegate/validation-summary");

        let content = registry.read_resource("ui://nodegate/validation-summary").unwrap();
        assert_eq!(content.text, "<html>v</html>");
        assert!(registry.read_resource("ui://nodegate/operation-result").is_none());
        assert!(registry.read_resource("ui://nodegate/unknown").is_none());
    }

    #[test]
    fn test_reset_clears_loaded_state() {
        let (registry, source) = registry();
        source.set_all("<html>x</html>");
        registry.load();

        registry.reset();

        assert!(!registry.is_loaded());
        assert!(registry.get_all_apps().is_empty());
        assert!(registry.get_app_for_tool("validate_node").is_none());
    }
}
