//! Changed-file listings and branch lookup.

use std::fmt;

use crate::error::CommandError;
use crate::git::GitRepo;
use crate::git::runner::CommandRunner;

/// Status of a changed file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    /// Map a single git status letter.
    fn from_code(code: char) -> Self {
        match code {
            'A' | '?' | 'C' => FileStatus::Added,
            'D' => FileStatus::Deleted,
            'R' => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Deleted => write!(f, "deleted"),
            FileStatus::Renamed => write!(f, "renamed"),
        }
    }
}

/// A file with uncommitted changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
}

/// Changed files, sorted by path with no duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    files: Vec<ChangedFile>,
}

impl ChangeSet {
    pub fn from_files(mut files: Vec<ChangedFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files.dedup_by(|a, b| a.path == b.path);
        Self { files }
    }

    pub fn files(&self) -> &[ChangedFile] {
        &self.files
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl<R: CommandRunner> GitRepo<R> {
    /// List changed files, dropping anything on the exclusion list.
    ///
    /// With `staged_only` the listing comes from the index; otherwise it
    /// covers staged, unstaged and untracked files.
    pub fn changed_files(&self, staged_only: bool) -> Result<ChangeSet, CommandError> {
        let files = if staged_only {
            let out = self.git(&["diff", "--cached", "--name-status", "-z"])?;
            parse_name_status(&out)
        } else {
            let out = self.git(&["status", "--porcelain", "-z", "-uall"])?;
            parse_porcelain(&out)
        };

        Ok(ChangeSet::from_files(
            files
                .into_iter()
                .filter(|f| !self.exclusions().is_match(&f.path))
                .collect(),
        ))
    }

    /// Everything currently in the index, exclusions included.
    pub fn staged_paths(&self) -> Result<Vec<String>, CommandError> {
        let out = self.git(&["diff", "--cached", "--name-status", "-z"])?;
        let mut paths: Vec<String> = parse_name_status(&out)
            .into_iter()
            .map(|f| f.path)
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }

    /// Files that differ between the merge base of `base` and `head`, and
    /// `head`. Exclusions are not applied.
    pub fn changes_between(&self, base: &str, head: &str) -> Result<ChangeSet, CommandError> {
        let range = format!("{base}...{head}");
        let out = self.git(&["diff", "--name-status", "-z", &range])?;
        Ok(ChangeSet::from_files(parse_name_status(&out)))
    }

    /// Name of the checked-out branch. Fails on a detached HEAD.
    pub fn current_branch(&self) -> Result<String, CommandError> {
        let out = self.git(&["symbolic-ref", "--short", "HEAD"])?;
        Ok(out.trim().to_string())
    }

    /// Fetch URL of `remote`.
    pub fn remote_url(&self, remote: &str) -> Result<String, CommandError> {
        let out = self.git(&["remote", "get-url", remote])?;
        Ok(out.trim().to_string())
    }
}

/// Parse `git status --porcelain -z` output.
///
/// Entries are `XY PATH`; renames and copies are followed by an extra
/// entry holding the original path.
fn parse_porcelain(output: &str) -> Vec<ChangedFile> {
    let mut entries = output.split('\0').filter(|e| !e.is_empty());
    let mut files = Vec::new();

    while let Some(entry) = entries.next() {
        let (Some(code), Some(path)) = (entry.get(..2), entry.get(3..)) else {
            continue;
        };
        let mut codes = code.chars();
        let x = codes.next().unwrap_or(' ');
        let y = codes.next().unwrap_or(' ');
        let letter = if x == ' ' { y } else { x };

        let old_path = if matches!(x, 'R' | 'C') {
            entries.next().map(String::from)
        } else {
            None
        };

        files.push(ChangedFile {
            path: path.to_string(),
            status: FileStatus::from_code(letter),
            old_path,
        });
    }

    files
}

/// Parse `git diff --name-status -z` output.
///
/// Fields are `STATUS\0PATH\0`, or `RNNN\0OLD\0NEW\0` for renames.
fn parse_name_status(output: &str) -> Vec<ChangedFile> {
    let mut fields = output.split('\0').filter(|f| !f.is_empty());
    let mut files = Vec::new();

    while let Some(code) = fields.next() {
        let letter = code.chars().next().unwrap_or('M');
        let (path, old_path) = if matches!(letter, 'R' | 'C') {
            let old = fields.next();
            let new = fields.next();
            match (old, new) {
                (Some(old), Some(new)) => (new.to_string(), Some(old.to_string())),
                _ => break,
            }
        } else {
            match fields.next() {
                Some(path) => (path.to_string(), None),
                None => break,
            }
        };

        files.push(ChangedFile {
            path,
            status: FileStatus::from_code(letter),
            old_path,
        });
    }

    files
}
