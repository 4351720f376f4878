use crate::error::Result;
use crate::types::TestConfig;
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

// Include the JSON file at compile time
const ENDPOINTS_JSON: &str = include_str!("../assets/endpoints.json");

// Global cache for the parsed built-in endpoints
static ENDPOINTS_CACHE: OnceLock<Endpoints> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoints {
    pub download: Vec<String>,
    pub upload: Vec<String>,
}

/// Built-in endpoint lists shipped in assets/endpoints.json
pub fn default_endpoints() -> Endpoints {
    ENDPOINTS_CACHE
        .get_or_init(|| {
            serde_json::from_str(ENDPOINTS_JSON)
                .expect("Failed to parse assets/endpoints.json. This is a compile-time error.")
        })
        .clone()
}

/// User overrides read from config.toml. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub duration_secs: Option<u64>,
    pub connections: Option<usize>,
    pub upload_chunk_size: Option<usize>,
    pub download_endpoints: Option<Vec<String>>,
    pub upload_endpoints: Option<Vec<String>>,
}

impl FileConfig {
    pub fn apply(self, config: &mut TestConfig) {
        if let Some(secs) = self.duration_secs {
            config.test_duration = Duration::from_secs(secs);
        }
        if let Some(connections) = self.connections {
            config.connections = connections;
        }
        if let Some(size) = self.upload_chunk_size {
            config.upload_chunk_size = size;
        }
        if let Some(urls) = self.download_endpoints {
            config.download_endpoints = urls;
        }
        if let Some(urls) = self.upload_endpoints {
            config.upload_endpoints = urls;
        }
    }
}

/// ~/.config/netquality/config.toml (or the platform equivalent)
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "netquality").map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)?;
    let parsed: FileConfig = toml::from_str(&content)?;
    debug!("Loaded configuration from {:?}", path);
    Ok(parsed)
}

/// Resolve the test configuration.
/// Strategy:
/// 1. Start from the built-in defaults
/// 2. Apply the explicit config file, or the user config if it exists
pub fn resolve(explicit: Option<&Path>) -> Result<TestConfig> {
    let mut config = TestConfig::default();

    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => user_config_path().filter(|p| p.exists()),
    };

    if let Some(path) = path {
        load_file_config(&path)?.apply(&mut config);
    }

    Ok(config)
}
