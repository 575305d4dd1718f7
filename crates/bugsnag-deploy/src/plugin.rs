//! Integration with a host build system.
//!
//! The host exposes an after-emit event through [`BuildHost`]. The
//! [`DeployPlugin`] taps it, resolves options, sends the notification and
//! reports any failure into the [`Compilation`]'s error list. The host's
//! completion signal is always invoked exactly once, whatever happened.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::warn;

use crate::options::{DeployOptions, DeployParams};
use crate::resolver::OptionResolver;
use crate::transport::{self, DeployTransport};

/// State of one finished build, as seen by the plugin.
#[derive(Debug)]
pub struct Compilation {
    working_dir: PathBuf,
    errors: Vec<anyhow::Error>,
}

impl Compilation {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            errors: Vec::new(),
        }
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    pub fn errors(&self) -> &[anyhow::Error] {
        &self.errors
    }

    pub fn push_error(&mut self, err: anyhow::Error) {
        self.errors.push(err);
    }

    pub fn into_errors(self) -> Vec<anyhow::Error> {
        self.errors
    }
}

/// One-shot completion signal handed to a hook.
///
/// Consumed by [`Done::call`], so it cannot fire twice.
pub struct Done(Box<dyn FnOnce()>);

impl Done {
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Self(Box::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn call(self) {
        (self.0)()
    }
}

/// Callback registered on the host's after-emit event.
pub type AfterEmitHook = Box<dyn FnMut(&mut Compilation, Done)>;

/// A build system that can run hooks after a successful emit.
pub trait BuildHost {
    fn tap_after_emit(&mut self, name: &'static str, hook: AfterEmitHook);
}

/// Reports a deploy to Bugsnag after each successful build.
pub struct DeployPlugin {
    resolver: OptionResolver,
    transport: Box<dyn DeployTransport>,
}

impl DeployPlugin {
    /// Hook name registered with the host.
    pub const NAME: &'static str = "BugsnagDeployPlugin";

    /// Plugin using git, the manifest reader and the public endpoint.
    pub fn new(options: DeployOptions) -> Result<Self> {
        Ok(Self::with_parts(
            OptionResolver::new(options),
            Box::new(transport::default_notifier()?),
        ))
    }

    /// Validate a raw options object and build the plugin.
    ///
    /// A missing or malformed `apiKey` fails here, before any build runs.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let options = DeployOptions::from_map(map).context("invalid Bugsnag deploy options")?;
        Self::new(options)
    }

    pub fn with_parts(resolver: OptionResolver, transport: Box<dyn DeployTransport>) -> Self {
        Self {
            resolver,
            transport,
        }
    }

    pub fn options(&self) -> &DeployOptions {
        self.resolver.options()
    }

    /// Parameters that would be sent for a build in `working_dir`.
    pub fn resolve(&self, working_dir: &Path) -> DeployParams {
        self.resolver.resolve(working_dir)
    }

    /// Resolve and send. Returns what was sent.
    pub fn notify(&self, working_dir: &Path) -> Result<DeployParams> {
        let params = self.resolve(working_dir);
        self.transport
            .send(&params)
            .context("failed to notify Bugsnag of deploy")?;
        Ok(params)
    }

    /// After-emit handler: never fails, always calls `done` once.
    pub fn on_after_emit(&self, compilation: &mut Compilation, done: Done) {
        if let Err(err) = self.notify(compilation.working_dir()) {
            warn!(error = %format!("{err:#}"), "deploy notification failed");
            compilation.push_error(err);
        }
        done.call();
    }

    /// Register on the host's after-emit event.
    pub fn apply(self, host: &mut dyn BuildHost) {
        host.tap_after_emit(
            Self::NAME,
            Box::new(move |compilation, done| self.on_after_emit(compilation, done)),
        );
    }
}
