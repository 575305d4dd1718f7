//! Configuration file support (`.bugsnag-deploy.toml`) and option layering.
//!
//! Explicit options come from three places, lowest precedence first: the
//! config file, `BUGSNAG_*` environment variables, and command-line flags.
//! Each layer is a JSON-like map so the result can be validated by
//! [`DeployOptions::from_map`](crate::options::DeployOptions::from_map).
//!
//! ```toml
//! apiKey = "0123456789abcdef0123456789abcdef"
//! releaseStage = "staging"
//! endpoint = "https://deploy.bugsnag.internal/deploy"
//! ```

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// Default configuration file name
pub const CONFIG_FILE: &str = ".bugsnag-deploy.toml";

/// Environment variables and the option each one sets.
pub const ENV_OPTIONS: [(&str, &str); 3] = [
    ("BUGSNAG_API_KEY", "apiKey"),
    ("BUGSNAG_RELEASE_STAGE", "releaseStage"),
    ("BUGSNAG_APP_VERSION", "appVersion"),
];

/// Get the config file path for a directory
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

/// Contents of a `.bugsnag-deploy.toml` file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    /// Every top-level key except `endpoint`, unfiltered.
    pub options: Map<String, Value>,
    /// Notification endpoint override
    pub endpoint: Option<String>,
}

impl FileConfig {
    /// Load `.bugsnag-deploy.toml` from `dir`.
    ///
    /// Returns `Ok(None)` if no config file exists.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let path = config_path(dir);
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from_file(&path).map(Some)
    }

    /// Load configuration from a specific file path
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let table: toml::Table = toml::from_str(content)?;
        let mut options = match serde_json::to_value(table)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let endpoint = match options.remove("endpoint") {
            Some(Value::String(url)) if !url.is_empty() => Some(url),
            Some(Value::String(_)) | None => None,
            Some(_) => anyhow::bail!("`endpoint` must be a string"),
        };

        Ok(Self { options, endpoint })
    }
}

/// Options set through [`ENV_OPTIONS`].
pub fn env_options() -> Map<String, Value> {
    ENV_OPTIONS
        .iter()
        .filter_map(|(var, key)| {
            env::var(var)
                .ok()
                .map(|value| (key.to_string(), Value::String(value)))
        })
        .collect()
}

/// Overlay `over` onto `base`. Null and empty-string values in `over` are
/// skipped so they never erase a lower layer.
pub fn layer(base: &mut Map<String, Value>, over: Map<String, Value>) {
    for (key, value) in over {
        match &value {
            Value::Null => continue,
            Value::String(s) if s.is_empty() => continue,
            _ => {
                base.insert(key, value);
            }
        }
    }
}
