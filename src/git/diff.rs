//! Diff text from the index or the working tree.

use std::collections::BTreeSet;

use crate::error::CommandError;
use crate::git::GitRepo;
use crate::git::runner::CommandRunner;

/// Which side of the index to diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffKind {
    /// Index against HEAD.
    Staged,
    /// Working tree against the index.
    Unstaged,
}

impl<R: CommandRunner> GitRepo<R> {
    /// Unified diff text, or an empty string when there is nothing to show.
    pub fn diff(&self, kind: DiffKind) -> Result<String, CommandError> {
        let out = match kind {
            DiffKind::Staged => self.git(&["diff", "--cached", "--no-color", "--no-ext-diff"])?,
            DiffKind::Unstaged => self.git(&["diff", "--no-color", "--no-ext-diff"])?,
        };
        if out.trim().is_empty() {
            Ok(String::new())
        } else {
            Ok(out)
        }
    }
}

impl<R: CommandRunner> GitRepo<R> {
    /// Diff of `head` against its merge base with `base`.
    pub fn diff_between(&self, base: &str, head: &str) -> Result<String, CommandError> {
        let range = format!("{base}...{head}");
        self.git(&["diff", "--no-color", "--no-ext-diff", &range])
    }
}

/// Paths touched by a unified diff, read from its `--- a/` and `+++ b/` headers.
pub fn touched_files(diff_text: &str) -> BTreeSet<String> {
    diff_text
        .lines()
        .filter_map(|line| {
            line.strip_prefix("+++ b/")
                .or_else(|| line.strip_prefix("--- a/"))
        })
        .map(|path| path.trim_end().to_string())
        .filter(|path| !path.is_empty())
        .collect()
}
