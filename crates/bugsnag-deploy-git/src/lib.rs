//! Git metadata detection for bugsnag-deploy.
//!
//! This crate asks the local `git` executable for the three facts a deploy
//! notification carries about source control: the current revision, the
//! `origin` remote URL and the checked-out branch.
//!
//! The three queries run concurrently and the result is all-or-nothing: if
//! any of them fails, [`GitInspector::inspect`] returns an error and no
//! partial metadata is produced.
//!
//! # Example
//!
//! ```no_run
//! use bugsnag_deploy_git::GitInspector;
//! use std::path::Path;
//!
//! let inspector = GitInspector::from_env();
//! if let Ok(vcs) = inspector.inspect(Path::new(".")) {
//!     println!("{} @ {}", vcs.repository, vcs.revision);
//! }
//! ```

use std::env;
use std::path::Path;
use std::process::Command;
use std::thread::{self, ScopedJoinHandle};

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use url::Url;

/// Environment variable overriding the `git` executable.
pub const GIT_BIN_ENV: &str = "BUGSNAG_DEPLOY_GIT_BIN";

/// Remote whose URL is reported as the repository.
pub const DEFAULT_REMOTE: &str = "origin";

/// Source control facts for a deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsMetadata {
    /// Full commit hash of `HEAD`
    pub revision: String,
    /// `origin` remote URL with any credentials removed
    pub repository: String,
    /// Branch name, `None` on a detached HEAD
    pub branch: Option<String>,
}

/// Runs read-only git queries against a working copy.
#[derive(Debug, Clone)]
pub struct GitInspector {
    program: String,
}

impl Default for GitInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl GitInspector {
    /// Inspector using `git` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Inspector using an explicit git executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Inspector honouring [`GIT_BIN_ENV`], falling back to `git`.
    pub fn from_env() -> Self {
        Self::with_program(env::var(GIT_BIN_ENV).unwrap_or_else(|_| "git".to_string()))
    }

    /// The executable this inspector invokes.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the current commit hash
    pub fn commit_hash(&self, path: &Path) -> Result<String> {
        self.run(path, &["rev-parse", "HEAD"])
    }

    /// Get the URL of `remote`, credentials included.
    pub fn remote_url(&self, path: &Path, remote: &str) -> Result<String> {
        self.run(path, &["remote", "get-url", remote])
    }

    /// Get the current branch name
    pub fn branch(&self, path: &Path) -> Result<Option<String>> {
        let branch = self.run(path, &["rev-parse", "--abbrev-ref", "HEAD"])?;

        // Detached HEAD
        if branch == "HEAD" {
            return Ok(None);
        }

        Ok(Some(branch))
    }

    /// Query revision, origin URL and branch concurrently.
    ///
    /// Fails if any single query fails.
    pub fn inspect(&self, path: &Path) -> Result<VcsMetadata> {
        let (revision, remote, branch) = thread::scope(|s| {
            let revision = s.spawn(|| self.commit_hash(path));
            let remote = s.spawn(|| self.remote_url(path, DEFAULT_REMOTE));
            let branch = s.spawn(|| self.branch(path));
            (join(revision), join(remote), join(branch))
        });

        combine(revision, remote, branch)
    }

    fn run(&self, path: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(path)
            .output()
            .with_context(|| format!("failed to run git {}; is git installed?", args.join(" ")))?;

        if !output.status.success() {
            bail!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T>>) -> Result<T> {
    handle
        .join()
        .unwrap_or_else(|_| Err(anyhow!("git query thread panicked")))
}

/// Combine the three query results into metadata, all-or-nothing.
///
/// The remote URL is sanitized before it is stored.
pub fn combine(
    revision: Result<String>,
    remote: Result<String>,
    branch: Result<Option<String>>,
) -> Result<VcsMetadata> {
    let revision = revision.context("vcs metadata discarded: revision query failed")?;
    let remote = remote.context("vcs metadata discarded: remote query failed")?;
    let branch = branch.context("vcs metadata discarded: branch query failed")?;

    Ok(VcsMetadata {
        revision,
        repository: sanitize_remote_url(&remote),
        branch,
    })
}

/// Inspect `path` with the git executable selected by the environment.
pub fn inspect(path: &Path) -> Result<VcsMetadata> {
    GitInspector::from_env().inspect(path)
}

/// Strip the user-info component from a remote URL.
///
/// Strings that are not hierarchical URLs (scp-style `git@host:org/repo`,
/// local paths) have no user-info component and are returned unchanged.
pub fn sanitize_remote_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            // Setters fail only when the URL cannot carry credentials.
            let _ = url.set_username("");
            let _ = url.set_password(None);
            url.to_string()
        }
        _ => raw.to_string(),
    }
}
