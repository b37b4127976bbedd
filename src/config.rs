use std::path::Path;

use serde::{Deserialize, Serialize};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// ZIP base name used when the requested directory has no base name
    #[serde(default = "default_fallback_archive_name")]
    pub fallback_archive_name: String,

    /// Maximum total uncompressed bytes packed into one ZIP (0 = unlimited)
    #[serde(default)]
    pub max_zip_bytes: u64,

    /// Maximum number of files packed into one ZIP (0 = unlimited)
    #[serde(default)]
    pub max_zip_entries: u64,

    /// Show dot-files in directory listings
    #[serde(default = "default_show_hidden")]
    pub show_hidden: bool,

    /// Serve index.html/index.htm instead of a generated listing
    #[serde(default)]
    pub serve_index: bool,
}

fn default_fallback_archive_name() -> String {
    "archive".to_string()
}

fn default_show_hidden() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fallback_archive_name: default_fallback_archive_name(),
            max_zip_bytes: 0,
            max_zip_entries: 0,
            show_hidden: default_show_hidden(),
            serve_index: false,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check if a listing entry should be hidden
    pub fn is_hidden(&self, name: &str) -> bool {
        !self.show_hidden && name.starts_with('.')
    }
}
