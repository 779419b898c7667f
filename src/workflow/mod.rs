//! The add-commit-push workflow and its batch driver.

pub mod batch;
pub mod config;
pub mod format;
pub mod interaction;
pub mod orchestrator;
pub mod state;
pub mod terminal;

pub use batch::{BatchReport, FileGroup, GroupReport, ROOT_GROUP, group_by_directory, run_batch};
pub use config::{FileSpec, WorkflowConfig};
pub use format::format_commit_message;
pub use interaction::Interaction;
pub use orchestrator::{Workflow, WorkflowEnv, WorkflowOutcome};
pub use state::WorkflowState;
pub use terminal::TerminalInteraction;
