//! Per-run workflow configuration.

use std::collections::BTreeSet;

use globset::GlobBuilder;
use tracing::{debug, warn};

use crate::classify::CommitType;
use crate::git::ChangeSet;
use crate::llm::{AiOverrides, PromptMode};

/// Which files a run should stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FileSpec {
    /// Nothing was given; the user picks interactively.
    #[default]
    Unspecified,
    /// Every changed file.
    All,
    /// Paths, directories or globs.
    Paths(Vec<String>),
}

impl FileSpec {
    /// Interpret raw command-line file arguments. Each argument is one path,
    /// directory or glob, spaces included; `.` or `all` selects everything.
    pub fn parse<S: AsRef<str>>(args: &[S]) -> Self {
        let items: Vec<String> = args
            .iter()
            .map(|a| a.as_ref().trim())
            .filter(|a| !a.is_empty())
            .map(String::from)
            .collect();

        if items.is_empty() {
            FileSpec::Unspecified
        } else if items
            .iter()
            .any(|i| i == "." || i == "./" || i.eq_ignore_ascii_case("all"))
        {
            FileSpec::All
        } else {
            FileSpec::Paths(items)
        }
    }

    /// Resolve against the current changes.
    ///
    /// Globs and directories expand to the changed files they cover. A
    /// literal path that matches no changed file is kept as given, so an
    /// explicitly named file reaches `git add` even when it is excluded.
    /// For renames the original path is included so the deletion is staged
    /// too.
    pub fn resolve(&self, changes: &ChangeSet) -> Vec<String> {
        let mut resolved = BTreeSet::new();
        match self {
            FileSpec::Unspecified => {}
            FileSpec::All => {
                for file in changes.files() {
                    resolved.insert(file.path.clone());
                    resolved.extend(file.old_path.clone());
                }
            }
            FileSpec::Paths(items) => {
                for item in items {
                    let target = normalize(item);
                    if target.is_empty() {
                        continue;
                    }
                    let matched: Vec<_> = changes
                        .files()
                        .iter()
                        .filter(|f| covers(&target, &f.path))
                        .collect();
                    if matched.is_empty() {
                        debug!("'{}' matches no changed file, passing it through", target);
                        resolved.insert(target);
                        continue;
                    }
                    for file in matched {
                        resolved.insert(file.path.clone());
                        resolved.extend(file.old_path.clone());
                    }
                }
            }
        }
        resolved.into_iter().collect()
    }
}

fn normalize(item: &str) -> String {
    let item = item.trim();
    let item = item.strip_prefix("./").unwrap_or(item);
    item.trim_end_matches('/').to_string()
}

/// Whether `target` (a path, directory or glob) covers `path`.
fn covers(target: &str, path: &str) -> bool {
    if path == target {
        return true;
    }
    if path
        .strip_prefix(target)
        .is_some_and(|rest| rest.starts_with('/'))
    {
        return true;
    }
    if !target.contains(['*', '?', '[', '{']) {
        return false;
    }
    match GlobBuilder::new(target).literal_separator(true).build() {
        Ok(glob) => glob.compile_matcher().is_match(path),
        Err(e) => {
            warn!("Ignoring invalid file pattern '{}': {}", target, e);
            false
        }
    }
}

/// Everything one run needs to know, fixed before it starts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowConfig {
    pub files: FileSpec,
    /// Empty means generate with AI or ask for it.
    pub message: String,
    /// None means the configured default, then the current branch.
    pub branch: Option<String>,
    pub commit_type: Option<CommitType>,
    pub use_ai: bool,
    pub interactive_edit: bool,
    pub skip_confirmation: bool,
    pub verbose: bool,
    pub dry_run: bool,
    pub prompt_mode: PromptMode,
    pub ai: AiOverrides,
}

impl WorkflowConfig {
    /// A copy of this configuration restricted to `files`, for one group of
    /// a batch run.
    pub fn for_files(&self, files: Vec<String>) -> Self {
        Self {
            files: FileSpec::Paths(files),
            ..self.clone()
        }
    }
}
