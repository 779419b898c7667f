//! Terminal prompts built on dialoguer.

use std::io::IsTerminal;

use dialoguer::{Confirm, Input, MultiSelect, Select};
use tracing::debug;

use crate::classify::CommitType;
use crate::error::InteractionError;
use crate::git::ChangeSet;
use crate::workflow::config::FileSpec;
use crate::workflow::interaction::Interaction;

/// Prompts on stderr, status lines on stdout.
#[derive(Debug)]
pub struct TerminalInteraction {
    /// Whether stdin is a terminal that can answer prompts.
    attached: bool,
}

impl TerminalInteraction {
    pub fn new() -> Self {
        Self::with_terminal(std::io::stdin().is_terminal())
    }

    /// Use `attached` instead of checking stdin. Without a terminal the
    /// message prompt yields nothing and every other prompt fails.
    pub fn with_terminal(attached: bool) -> Self {
        Self { attached }
    }

    fn require_terminal(&self) -> Result<(), InteractionError> {
        if self.attached {
            Ok(())
        } else {
            Err(InteractionError::Io(
                "input is not a terminal; pass the needed flags (-a, -m, -t, -y) instead".into(),
            ))
        }
    }
}

impl Default for TerminalInteraction {
    fn default() -> Self {
        Self::new()
    }
}

fn cancelled(err: dialoguer::Error) -> InteractionError {
    debug!("Prompt ended: {}", err);
    InteractionError::Cancelled
}

impl Interaction for TerminalInteraction {
    fn select_files(&self, changes: &ChangeSet) -> Result<FileSpec, InteractionError> {
        self.require_terminal()?;
        let mut items = vec!["All files".to_string()];
        items.extend(
            changes
                .files()
                .iter()
                .map(|f| format!("{} ({})", f.path, f.status)),
        );

        let picked = MultiSelect::new()
            .with_prompt("Select files to commit (space to toggle, enter to confirm)")
            .items(&items[..])
            .interact_opt()
            .map_err(cancelled)?
            .ok_or(InteractionError::Cancelled)?;

        if picked.contains(&0) {
            return Ok(FileSpec::All);
        }
        let paths: Vec<String> = picked
            .into_iter()
            .filter_map(|i| changes.files().get(i - 1))
            .map(|f| f.path.clone())
            .collect();
        if paths.is_empty() {
            Ok(FileSpec::Unspecified)
        } else {
            Ok(FileSpec::Paths(paths))
        }
    }

    fn edit_message(&self, message: &str) -> Result<String, InteractionError> {
        self.require_terminal()?;
        Input::<String>::new()
            .with_prompt("Commit message")
            .with_initial_text(message)
            .allow_empty(true)
            .interact_text()
            .map_err(cancelled)
    }

    fn prompt_message(&self) -> Result<Option<String>, InteractionError> {
        if !self.attached {
            debug!("No terminal to ask for a commit message");
            return Ok(None);
        }
        let message: String = Input::new()
            .with_prompt("Enter commit message")
            .allow_empty(true)
            .interact_text()
            .map_err(cancelled)?;
        let message = message.trim();
        Ok((!message.is_empty()).then(|| message.to_string()))
    }

    fn select_commit_type(&self, suggested: CommitType) -> Result<CommitType, InteractionError> {
        self.require_terminal()?;
        let items: Vec<String> = CommitType::ALL
            .iter()
            .map(|t| {
                let marker = if *t == suggested { " (suggested)" } else { "" };
                format!("{:<12} {}{}", t.label(), t.description(), marker)
            })
            .collect();
        let default = CommitType::ALL
            .iter()
            .position(|t| *t == suggested)
            .unwrap_or(0);

        let index = Select::new()
            .with_prompt("Commit type")
            .items(&items[..])
            .default(default)
            .interact_opt()
            .map_err(cancelled)?
            .ok_or(InteractionError::Cancelled)?;
        Ok(CommitType::ALL[index])
    }

    fn confirm(&self, question: &str) -> Result<bool, InteractionError> {
        self.require_terminal()?;
        Confirm::new()
            .with_prompt(question)
            .default(true)
            .interact()
            .map_err(cancelled)
    }

    fn notify(&self, message: &str) {
        println!("{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_message_prompt_yields_nothing() {
        let ui = TerminalInteraction::with_terminal(false);
        assert_eq!(ui.prompt_message().unwrap(), None);
    }

    #[test]
    fn test_detached_confirm_fails() {
        let ui = TerminalInteraction::with_terminal(false);
        assert!(matches!(ui.confirm("Proceed?"), Err(InteractionError::Io(_))));
    }
}
