//! Running git subcommands.
//!
//! All operations shell out to the system `git` binary, inheriting the user's
//! existing git config, SSH agent, and credential store.

use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::CommandError;

/// Captured output of a successful git invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Executes git subcommands. No retries: callers decide what to do on failure.
pub trait CommandRunner {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, CommandError>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, CommandError> {
        (**self).run(args)
    }
}

/// Runs the system `git` binary in a fixed working directory.
#[derive(Debug, Clone)]
pub struct GitCommand {
    workdir: PathBuf,
}

impl GitCommand {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }
}

impl CommandRunner for GitCommand {
    fn run(&self, args: &[&str]) -> Result<CommandOutput, CommandError> {
        debug!("git {}", args.join(" "));

        // Messages are parsed for error categories, so pin them to English.
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.workdir)
            .env("LC_ALL", "C")
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CommandError::NotInstalled,
                _ => CommandError::Spawn(e),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            // Some failures (e.g. "nothing to commit") are reported on stdout.
            let message = if stderr.trim().is_empty() { &stdout } else { &stderr };
            let err = CommandError::failed(args, message, output.status.code());
            debug!("git {} failed: {}", args.join(" "), err);
            return Err(err);
        }

        Ok(CommandOutput { stdout, stderr })
    }
}

/// Check that git is installed and on PATH.
pub fn check_git_installed() -> Result<(), CommandError> {
    which::which("git")
        .map(|_| ())
        .map_err(|_| CommandError::NotInstalled)
}
