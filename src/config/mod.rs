/// Configuration management for the nodegate server
///
/// Handles server binding, the shared node database location, and the UI app bundle directory.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Node database configuration
    pub database: DatabaseConfig,
    /// UI app bundle configuration
    pub ui: UiConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Server port number
    pub port: u16,
}

/// Shared node database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite node database shared by every session (default: "data/nodes.db")
    /// Only one path may be active per process.
    pub path: String,
    /// Upper bound on opening the database, in seconds. 0 disables the bound.
    pub init_timeout_secs: u64,
}

/// UI app bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Directory holding built UI apps as {dist_dir}/{app_id}/index.html
    pub dist_dir: String,
}

impl DatabaseConfig {
    /// Initialization timeout, or None when disabled
    pub fn init_timeout(&self) -> Option<Duration> {
        (self.init_timeout_secs > 0).then(|| Duration::from_secs(self.init_timeout_secs))
    }
}

impl Default for Config {
    /// Default configuration with ENV_VAR support for container deployment
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: std::env::var("NODEGATE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("NODEGATE_PORT")
                    .unwrap_or_else(|_| "3010".to_string())
                    .parse()
                    .unwrap_or(3010),
            },
            database: DatabaseConfig {
                path: std::env::var("NODEGATE_DB_PATH")
                    .unwrap_or_else(|_| "data/nodes.db".to_string()),
                init_timeout_secs: std::env::var("NODEGATE_DB_INIT_TIMEOUT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            },
            ui: UiConfig {
                dist_dir: std::env::var("NODEGATE_UI_DIST")
                    .unwrap_or_else(|_| "ui-apps/dist".to_string()),
            },
        }
    }
}
