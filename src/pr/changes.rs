//! Commits, files and diff a source branch adds on top of its target.

use tracing::debug;

use crate::error::PrError;
use crate::git::{ChangeSet, CommandRunner, FileStatus, GitRepo};

/// Everything `head` changes relative to `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchChanges {
    pub base: String,
    pub head: String,
    /// Commit subjects, newest first.
    pub commits: Vec<String>,
    pub files: ChangeSet,
    pub diff: String,
}

impl BranchChanges {
    /// Read the changes from git. A branch with nothing to merge is an error.
    pub fn gather<R: CommandRunner>(
        repo: &GitRepo<R>,
        base: &str,
        head: &str,
    ) -> Result<Self, PrError> {
        let commits = repo.commit_subjects_between(base, head).map_err(PrError::Git)?;
        if commits.is_empty() {
            return Err(PrError::NoCommits {
                base: base.to_string(),
                head: head.to_string(),
            });
        }

        let files = repo.changes_between(base, head).map_err(PrError::Git)?;
        let diff = repo.diff_between(base, head).map_err(PrError::Git)?;
        debug!(
            "{head} is {} commits and {} files ahead of {base}",
            commits.len(),
            files.len()
        );

        Ok(Self {
            base: base.to_string(),
            head: head.to_string(),
            commits,
            files,
            diff,
        })
    }

    pub fn added(&self) -> Vec<&str> {
        self.paths_with(&[FileStatus::Added])
    }

    /// Modified files, renames included.
    pub fn modified(&self) -> Vec<&str> {
        self.paths_with(&[FileStatus::Modified, FileStatus::Renamed])
    }

    pub fn deleted(&self) -> Vec<&str> {
        self.paths_with(&[FileStatus::Deleted])
    }

    fn paths_with(&self, statuses: &[FileStatus]) -> Vec<&str> {
        self.files
            .files()
            .iter()
            .filter(|f| statuses.contains(&f.status))
            .map(|f| f.path.as_str())
            .collect()
    }
}
