//! git-acp - add, commit and push in one step, with optional AI commit messages.
//!
//! # Overview
//!
//! git-acp stages the selected files, resolves a commit message (given,
//! generated by an OpenAI-compatible model, or typed in), classifies it into
//! a conventional commit type, commits and pushes. Every failure before the
//! commit leaves the index as it found it.
//!
//! The `pr` command opens a GitHub pull request for a branch, with a
//! description built from its commits and diff.

pub mod classify;
pub mod config;
pub mod error;
pub mod git;
pub mod github;
pub mod llm;
pub mod pattern;
pub mod pr;
pub mod workflow;

// Re-export commonly used types
pub use classify::{Classification, Classifier, CommitType};
pub use config::Settings;
pub use error::{AbortKind, AiError, CommandError, GitHubError, PrError, WorkflowError};
pub use git::{GitCommand, GitRepo};
pub use workflow::{Workflow, WorkflowConfig, WorkflowEnv, WorkflowOutcome, WorkflowState};
