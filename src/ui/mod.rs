/// UI App Layer
///
/// Bundled HTML views hosts can render for tool results:
/// - Static app configuration and tool-name patterns
/// - Payload sources for built bundles
/// - Lock-free reloadable registry using ArcSwap

pub mod types;

pub mod configs;

pub mod source;

pub mod registry;

// Re-export commonly used types
pub use configs::default_app_configs;
pub use registry::UiAppRegistry;
pub use source::{DistDirSource, PayloadSource};
pub use types::{ToolMetaTarget, UiAppConfig, UiAppEntry, UiResource, UiResourceContent};
