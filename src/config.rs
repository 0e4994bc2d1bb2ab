use crate::error::{MirrorError, Result};
use crate::types::Mirror;
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

// Include the JSON file at compile time
const MIRRORS_JSON: &str = include_str!("../assets/mirrors.json");

const CONFIG_FILE_NAME: &str = ".pypi_mirror_config.json";

pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;

/// Small package every index serves; fetched once per mirror while probing
pub const PROBE_PACKAGE: &str = "pip";

/// Runtime settings for one invocation, assembled by `main` from CLI flags
#[derive(Debug, Clone)]
pub struct Settings {
    /// Interpreter used as `<python> -m pip`
    pub python: String,
    pub probe_timeout: Duration,
    pub config_path: PathBuf,
}

pub fn default_python() -> &'static str {
    if cfg!(windows) {
        "python"
    } else {
        "python3"
    }
}

/// ~/.pypi_mirror_config.json
pub fn default_config_path() -> PathBuf {
    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(CONFIG_FILE_NAME))
}

/// Retrieve the mirror catalog
/// Strategy:
/// 1. Try to load from User Config (~/.config/pymirror/mirrors.json)
/// 2. Fallback to built-in assets/mirrors.json
pub fn load_catalog() -> Result<Vec<Mirror>> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "pymirror") {
        let config_path = proj_dirs.config_dir().join("mirrors.json");
        if config_path.exists() {
            let loaded = std::fs::read_to_string(&config_path)
                .map_err(MirrorError::from)
                .and_then(|content| parse_catalog(&content));
            match loaded {
                Ok(mirrors) => {
                    debug!(path = %config_path.display(), count = mirrors.len(), "loaded mirrors from local config");
                    return Ok(mirrors);
                }
                Err(e) => warn!(path = %config_path.display(), "ignoring local mirror list: {}", e),
            }
        }
    }

    parse_catalog(MIRRORS_JSON)
}

/// Parse a JSON array of `{"name", "url"}` objects.
/// Names are unique ignoring case and the list is never empty.
pub fn parse_catalog(content: &str) -> Result<Vec<Mirror>> {
    let mirrors: Vec<Mirror> = serde_json::from_str(content)?;
    if mirrors.is_empty() {
        return Err(MirrorError::Config("mirror list is empty".to_string()));
    }

    let mut seen = HashSet::new();
    for m in &mirrors {
        if !seen.insert(m.name.to_lowercase()) {
            return Err(MirrorError::Config(format!("duplicate mirror name '{}'", m.name)));
        }
    }
    Ok(mirrors)
}

/// Case-insensitive lookup by display name
pub fn find_mirror<'a>(catalog: &'a [Mirror], name: &str) -> Option<&'a Mirror> {
    catalog.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

/// Persisted user choice (`~/.pypi_mirror_config.json`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mirror: Option<Mirror>,

    /// Keys written by something else; kept as-is on rewrite
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MirrorConfig {
    /// Never fails: a missing, unreadable or malformed file yields an empty config.
    pub async fn load(path: &Path) -> Self {
        if !fs::try_exists(path).await.unwrap_or(false) {
            debug!(path = %path.display(), "no config file, using defaults");
            return Self::default();
        }

        let parsed = match fs::read_to_string(path).await {
            Ok(content) => serde_json::from_str::<Self>(&content).map_err(MirrorError::from),
            Err(e) => Err(MirrorError::from(e)),
        };

        parsed.unwrap_or_else(|e| {
            warn!(path = %path.display(), "failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Rewrite the whole file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');
        fs::write(path, content).await?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }
}
