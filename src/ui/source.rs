/// Payload sources for UI app bundles

use std::io;
use std::path::{Path, PathBuf};

/// Where the registry reads app HTML from, keyed by app id
pub trait PayloadSource: Send + Sync {
    /// Whether a payload exists for `app_id`
    fn exists(&self, app_id: &str) -> bool;

    /// Read the full payload for `app_id`
    fn read(&self, app_id: &str) -> io::Result<String>;
}

/// Built bundles laid out as {dist_dir}/{app_id}/index.html
#[derive(Debug, Clone)]
pub struct DistDirSource {
    dist_dir: PathBuf,
}

impl DistDirSource {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: dist_dir.into(),
        }
    }

    /// HTML path for an app
    pub fn html_path(&self, app_id: &str) -> PathBuf {
        self.dist_dir.join(app_id).join("index.html")
    }

    pub fn dist_dir(&self) -> &Path {
        &self.dist_dir
    }
}

impl PayloadSource for DistDirSource {
    fn exists(&self, app_id: &str) -> bool {
        self.html_path(app_id).is_file()
    }

    fn read(&self, app_id: &str) -> io::Result<String> {
        std::fs::read_to_string(self.html_path(app_id))
    }
}
