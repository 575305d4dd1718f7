//! A build host that runs an external build command.
//!
//! After the command exits successfully every hook registered through
//! [`BuildHost::tap_after_emit`] runs against a fresh [`Compilation`]. Hook
//! failures end up in the compilation's error list; they never change the
//! build's exit status.

use std::cell::Cell;
use std::path::Path;
use std::process::{Command, ExitCode, ExitStatus};
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::debug;

use bugsnag_deploy::plugin::{AfterEmitHook, BuildHost, Compilation, Done};

use crate::Reporter;

/// Result of one build plus whatever the hooks reported.
#[derive(Debug)]
pub struct BuildOutcome {
    pub status: ExitStatus,
    pub errors: Vec<anyhow::Error>,
}

impl BuildOutcome {
    /// The build's own exit code, unaffected by hook errors.
    pub fn exit_code(&self) -> ExitCode {
        match self.status.code() {
            Some(0) => ExitCode::SUCCESS,
            Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            None => ExitCode::FAILURE,
        }
    }
}

#[derive(Default)]
pub struct CommandHost {
    hooks: Vec<(&'static str, AfterEmitHook)>,
}

impl BuildHost for CommandHost {
    fn tap_after_emit(&mut self, name: &'static str, hook: AfterEmitHook) {
        self.hooks.push((name, hook));
    }
}

impl CommandHost {
    /// Run `command` in `working_dir`; fire the after-emit hooks if it succeeds.
    pub fn run_build(
        &mut self,
        command: &[String],
        working_dir: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<BuildOutcome> {
        let (program, args) = command.split_first().context("no build command given")?;

        reporter.info(&format!("running build: {}", command.join(" ")));
        debug!(program = %program, dir = %working_dir.display(), "spawning build command");
        let status = Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .status()
            .with_context(|| format!("failed to execute build command `{program}`"))?;

        if !status.success() {
            reporter.warn(&format!("build failed ({status}); skipping after-emit hooks"));
            return Ok(BuildOutcome {
                status,
                errors: Vec::new(),
            });
        }

        debug!(hooks = self.hooks.len(), "build succeeded; firing after-emit hooks");
        let mut compilation = Compilation::new(working_dir);
        for (name, hook) in &mut self.hooks {
            debug!(hook = *name, "running after-emit hook");
            let completed = Rc::new(Cell::new(false));
            let flag = Rc::clone(&completed);
            hook(&mut compilation, Done::new(move || flag.set(true)));
            if !completed.get() {
                reporter.warn(&format!("{name} did not signal completion"));
            }
        }

        Ok(BuildOutcome {
            status,
            errors: compilation.into_errors(),
        })
    }
}
