//! Deploy notification transport for bugsnag-deploy.
//!
//! A [`DeployNotifier`] performs exactly one JSON `POST` per call to the
//! Bugsnag deploy endpoint. There is no retry and no timeout beyond the HTTP
//! client defaults; any transport error or non-success status is returned to
//! the caller.
//!
//! # Example
//!
//! ```ignore
//! use bugsnag_deploy_notify::{DeployNotifier, user_agent};
//! use serde_json::json;
//!
//! let notifier = DeployNotifier::new(user_agent("bugsnag-deploy", "0.1.0"))?;
//! notifier.send(&json!({
//!     "apiKey": "0123456789abcdef0123456789abcdef",
//!     "appVersion": "1.2.3",
//! }))?;
//! ```

use anyhow::{Context, Result, bail};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::Serialize;
use tracing::{debug, info};

/// Bugsnag deploy notification endpoint.
pub const DEPLOY_ENDPOINT: &str = "https://notify.bugsnag.com/deploy";

/// Format a `<name>/<version>` user agent.
pub fn user_agent(name: &str, version: &str) -> String {
    format!("{name}/{version}")
}

/// HTTP client for the deploy endpoint.
#[derive(Debug, Clone)]
pub struct DeployNotifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    user_agent: String,
}

impl DeployNotifier {
    /// Create a notifier for [`DEPLOY_ENDPOINT`] identifying itself as `user_agent`.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: DEPLOY_ENDPOINT.to_string(),
            user_agent: user_agent.into(),
        })
    }

    /// Send to a different endpoint (on-premise installs, tests).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// POST `payload` as JSON. Non-2xx responses are errors.
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let body =
            serde_json::to_string(payload).context("failed to serialize deploy payload")?;

        debug!(endpoint = %self.endpoint, "sending deploy notification");

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(USER_AGENT, &self.user_agent)
            .body(body)
            .send()
            .with_context(|| format!("failed to send deploy notification to {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("deploy notification failed with status {status}: {body}");
        }

        info!(endpoint = %self.endpoint, %status, "deploy notification accepted");
        Ok(())
    }
}
