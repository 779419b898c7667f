//! Index and history mutations: stage, unstage, commit, push.

use tracing::debug;

use crate::error::CommandError;
use crate::git::GitRepo;
use crate::git::runner::CommandRunner;

impl<R: CommandRunner> GitRepo<R> {
    /// Stage exactly `paths`, including deletions.
    pub fn stage(&self, paths: &[String]) -> Result<(), CommandError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.git(&args)?;
        debug!("Staged {} paths", paths.len());
        Ok(())
    }

    /// Clear the index back to HEAD, leaving the working tree untouched.
    pub fn unstage_all(&self) -> Result<(), CommandError> {
        if self.has_head()? {
            self.git(&["reset", "-q", "HEAD", "--"])?;
        } else {
            // No HEAD to reset to: everything in the index is a new file.
            self.git(&["rm", "-r", "-q", "--cached", "--ignore-unmatch", "--", "."])?;
        }
        Ok(())
    }

    /// Whether HEAD points at a commit.
    pub fn has_head(&self) -> Result<bool, CommandError> {
        match self.runner().run(&["rev-parse", "--verify", "-q", "HEAD"]) {
            Ok(_) => Ok(true),
            Err(CommandError::Failed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Commit the index and return the new commit hash.
    pub fn commit(&self, message: &str) -> Result<String, CommandError> {
        self.git(&["commit", "-q", "-m", message])?;
        self.head_commit()
    }

    pub fn head_commit(&self) -> Result<String, CommandError> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    pub fn push(&self, remote: &str, branch: &str) -> Result<(), CommandError> {
        self.git(&["push", remote, branch])?;
        Ok(())
    }
}
