//! Git access through the command runner.

pub mod diff;
pub mod history;
pub mod ops;
pub mod runner;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use diff::{DiffKind, touched_files};
pub use history::{CommitPatterns, CommitSummary, analyze_patterns};
pub use runner::{CommandOutput, CommandRunner, GitCommand, check_git_installed};
pub use status::{ChangeSet, ChangedFile, FileStatus};

use crate::error::CommandError;
use crate::pattern::PathMatcher;

/// A repository reached through a [`CommandRunner`], with the exclusion
/// list applied to every file listing.
#[derive(Debug, Clone)]
pub struct GitRepo<R> {
    runner: R,
    exclusions: PathMatcher,
}

impl<R: CommandRunner> GitRepo<R> {
    pub fn new(runner: R, exclusions: PathMatcher) -> Self {
        Self { runner, exclusions }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn exclusions(&self) -> &PathMatcher {
        &self.exclusions
    }

    fn git(&self, args: &[&str]) -> Result<String, CommandError> {
        self.runner.run(args).map(|output| output.stdout)
    }
}
