//! # bugsnag-deploy
//!
//! Report a deploy to Bugsnag after a successful build.
//!
//! The plugin infers deploy metadata from the local git checkout and the
//! nearest package manifest, merges it with explicitly configured options and
//! sends a single JSON `POST` to `https://notify.bugsnag.com/deploy`.
//!
//! ## Pipeline
//!
//! 1. [`options::DeployOptions`] validates the explicit configuration once,
//!    when the plugin is built. A missing or wrong-length `apiKey` is fatal.
//! 2. On every build, [`resolver::OptionResolver::resolve`] runs git and
//!    manifest detection concurrently and merges
//!    `defaults < detected < explicit`. Detection failures are ignored.
//! 3. [`transport::DeployTransport`] sends the result; by default this is
//!    the HTTP [`DeployNotifier`](bugsnag_deploy_notify::DeployNotifier).
//! 4. [`plugin::DeployPlugin`] ties it together behind a host's after-emit
//!    hook and records failures in the build's error list instead of
//!    failing the build.
//!
//! ## Example
//!
//! ```ignore
//! use bugsnag_deploy::options::DeployOptions;
//! use bugsnag_deploy::plugin::{Compilation, DeployPlugin, Done};
//!
//! let plugin = DeployPlugin::new(DeployOptions::new("0123456789abcdef0123456789abcdef")?)?;
//! let mut compilation = Compilation::new(".");
//! plugin.on_after_emit(&mut compilation, Done::noop());
//! for err in compilation.errors() {
//!     eprintln!("[error] {err:#}");
//! }
//! ```
//!
//! ## Modules
//!
//! - [`options`]: allow-listed option keys and the wire record
//! - [`resolver`]: metadata sources and the three-layer merge
//! - [`transport`]: the notifier seam and user agent
//! - [`plugin`]: host integration
//! - [`config`]: `.bugsnag-deploy.toml` and environment layering

/// Configuration file (`.bugsnag-deploy.toml`) loading and layering.
pub mod config;

/// Allow-listed options and the request record.
pub mod options;

/// Host build system integration.
pub mod plugin;

/// Metadata detection and option merging.
pub mod resolver;

/// Delivery of resolved parameters.
pub mod transport;

/// Git metadata detection.
/// Re-exported from the bugsnag-deploy-git microcrate.
pub use bugsnag_deploy_git as git;

/// Package manifest lookup.
/// Re-exported from the bugsnag-deploy-manifest microcrate.
pub use bugsnag_deploy_manifest as manifest;

/// HTTP notifier.
/// Re-exported from the bugsnag-deploy-notify microcrate.
pub use bugsnag_deploy_notify as notify;
