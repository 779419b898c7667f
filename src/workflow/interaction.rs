//! The user-facing side of the workflow.

use crate::classify::CommitType;
use crate::error::InteractionError;
use crate::git::ChangeSet;
use crate::workflow::config::FileSpec;

/// Prompts and notices the workflow needs from whoever is driving it.
///
/// Every prompt may return [`InteractionError::Cancelled`], which aborts the
/// run the same way Ctrl-C does.
#[cfg_attr(test, mockall::automock)]
pub trait Interaction {
    /// Pick files to stage from the current changes.
    fn select_files(&self, changes: &ChangeSet) -> Result<FileSpec, InteractionError>;

    /// Let the user edit `message`. Returns the edited text.
    fn edit_message(&self, message: &str) -> Result<String, InteractionError>;

    /// Ask for a commit message. `None` when the user enters nothing.
    fn prompt_message(&self) -> Result<Option<String>, InteractionError>;

    /// Pick a commit type, with `suggested` preselected.
    fn select_commit_type(&self, suggested: CommitType) -> Result<CommitType, InteractionError>;

    /// Ask a yes/no question.
    fn confirm(&self, question: &str) -> Result<bool, InteractionError>;

    /// Show a status line.
    fn notify(&self, message: &str);
}
