//! Deploy options: the allow-listed configuration surface and the wire record.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keys accepted from user configuration. Everything else is ignored.
pub const OPTION_KEYS: [&str; 7] = [
    "apiKey",
    "releaseStage",
    "repository",
    "provider",
    "branch",
    "revision",
    "appVersion",
];

/// Required length of a Bugsnag API key.
pub const API_KEY_LEN: usize = 32;

/// Release stage used when neither detection nor configuration supplies one.
pub const DEFAULT_RELEASE_STAGE: &str = "production";

/// Fatal configuration errors, raised when the plugin is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("apiKey is required")]
    MissingApiKey,
    #[error("apiKey must be {API_KEY_LEN} characters long (got {len})")]
    InvalidApiKeyLength { len: usize },
    #[error("option `{key}` must be a string, number or boolean")]
    InvalidValue { key: String },
}

/// A validated 32-character API key.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        if raw.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        let len = raw.chars().count();
        if len != API_KEY_LEN {
            return Err(ConfigError::InvalidApiKeyLength { len });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last four characters only, for logs and dry runs.
    pub fn redacted(&self) -> String {
        let tail: String = self.0.chars().skip(API_KEY_LEN - 4).collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.redacted())
    }
}

/// Deploy fields in wire form.
///
/// The same record is used for every layer (defaults, detected metadata,
/// explicit configuration) and for the request body. Absent fields are
/// omitted from the JSON entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_stage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

impl DeployParams {
    /// Built-in lowest-precedence layer.
    pub fn defaults() -> Self {
        Self {
            release_stage: Some(DEFAULT_RELEASE_STAGE.to_string()),
            ..Default::default()
        }
    }

    /// Field-wise merge where values present in `self` win over `base`.
    pub fn or(self, base: DeployParams) -> DeployParams {
        DeployParams {
            api_key: self.api_key.or(base.api_key),
            release_stage: self.release_stage.or(base.release_stage),
            repository: self.repository.or(base.repository),
            provider: self.provider.or(base.provider),
            branch: self.branch.or(base.branch),
            revision: self.revision.or(base.revision),
            app_version: self.app_version.or(base.app_version),
        }
    }

    /// Drop empty strings so they neither override lower layers nor reach the wire.
    pub fn normalized(mut self) -> Self {
        for key in OPTION_KEYS {
            if let Some(field) = self.field_mut(key)
                && field.as_deref().is_some_and(str::is_empty)
            {
                *field = None;
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        OPTION_KEYS.iter().all(|key| self.get(key).is_none())
    }

    /// Look a field up by its wire key.
    pub fn get(&self, key: &str) -> Option<&str> {
        let field = match key {
            "apiKey" => &self.api_key,
            "releaseStage" => &self.release_stage,
            "repository" => &self.repository,
            "provider" => &self.provider,
            "branch" => &self.branch,
            "revision" => &self.revision,
            "appVersion" => &self.app_version,
            _ => return None,
        };
        field.as_deref()
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut Option<String>> {
        match key {
            "apiKey" => Some(&mut self.api_key),
            "releaseStage" => Some(&mut self.release_stage),
            "repository" => Some(&mut self.repository),
            "provider" => Some(&mut self.provider),
            "branch" => Some(&mut self.branch),
            "revision" => Some(&mut self.revision),
            "appVersion" => Some(&mut self.app_version),
            _ => None,
        }
    }
}

/// Explicit plugin configuration, validated once at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOptions {
    api_key: ApiKey,
    params: DeployParams,
}

impl DeployOptions {
    /// Options carrying only an API key.
    pub fn new(api_key: &str) -> Result<Self, ConfigError> {
        Self::from_params(DeployParams {
            api_key: Some(api_key.to_string()),
            ..Default::default()
        })
    }

    /// Validate a typed record.
    pub fn from_params(params: DeployParams) -> Result<Self, ConfigError> {
        let params = params.normalized();
        let api_key = ApiKey::parse(params.api_key.as_deref().unwrap_or_default())?;
        Ok(Self { api_key, params })
    }

    /// Build options from an arbitrary JSON-like object.
    ///
    /// Only [`OPTION_KEYS`] are read; other keys are silently ignored.
    /// Scalars are converted to strings, `null` counts as absent.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, ConfigError> {
        let mut params = DeployParams::default();

        for key in OPTION_KEYS {
            let value = match map.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(Value::Bool(b)) => b.to_string(),
                Some(_) => {
                    return Err(ConfigError::InvalidValue {
                        key: key.to_string(),
                    });
                }
            };
            if let Some(field) = params.field_mut(key) {
                *field = Some(value);
            }
        }

        Self::from_params(params)
    }

    pub fn api_key(&self) -> &ApiKey {
        &self.api_key
    }

    /// The explicit layer, API key included.
    pub fn params(&self) -> &DeployParams {
        &self.params
    }
}
