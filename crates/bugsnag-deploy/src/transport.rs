//! The seam between the plugin and the HTTP notifier.

use anyhow::Result;

use bugsnag_deploy_notify::{DeployNotifier, user_agent};

use crate::options::DeployParams;

/// Name sent in the user agent.
pub const PLUGIN_NAME: &str = "bugsnag-deploy";

/// Version sent in the user agent.
pub const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Delivers resolved parameters somewhere.
pub trait DeployTransport {
    fn send(&self, params: &DeployParams) -> Result<()>;
}

impl DeployTransport for DeployNotifier {
    fn send(&self, params: &DeployParams) -> Result<()> {
        DeployNotifier::send(self, params)
    }
}

/// `bugsnag-deploy/<version>`
pub fn plugin_user_agent() -> String {
    user_agent(PLUGIN_NAME, PLUGIN_VERSION)
}

/// Notifier for the public endpoint with this plugin's user agent.
pub fn default_notifier() -> Result<DeployNotifier> {
    DeployNotifier::new(plugin_user_agent())
}
