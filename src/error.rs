//! Error types for git-acp modules using thiserror.

use std::fmt;

use thiserror::Error;

use crate::workflow::WorkflowState;

/// Stable category for a failed git invocation, derived from its stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandCategory {
    NotARepository,
    PermissionDenied,
    Rejected,
    Conflict,
    NothingToCommit,
    NoUpstream,
    RemoteUnavailable,
    PathspecNoMatch,
    EmptyHistory,
    Generic,
}

/// Ordered stderr fragments. First match wins, so the more specific
/// fragments sit above the ones they contain.
const STDERR_PATTERNS: &[(&str, CommandCategory)] = &[
    ("does not appear to be a git repository", CommandCategory::RemoteUnavailable),
    ("could not read from remote", CommandCategory::RemoteUnavailable),
    ("not a git repository", CommandCategory::NotARepository),
    ("not a repository", CommandCategory::NotARepository),
    ("permission denied", CommandCategory::PermissionDenied),
    ("rejected", CommandCategory::Rejected),
    ("non-fast-forward", CommandCategory::Rejected),
    ("conflict", CommandCategory::Conflict),
    ("nothing to commit", CommandCategory::NothingToCommit),
    ("nothing added to commit", CommandCategory::NothingToCommit),
    ("no upstream branch", CommandCategory::NoUpstream),
    ("has no upstream", CommandCategory::NoUpstream),
    ("did not match any files", CommandCategory::PathspecNoMatch),
    ("does not have any commits yet", CommandCategory::EmptyHistory),
    ("bad default revision", CommandCategory::EmptyHistory),
    ("ambiguous argument 'head'", CommandCategory::EmptyHistory),
];

impl CommandCategory {
    /// Classify raw stderr text. Matching is case-insensitive.
    pub fn from_stderr(stderr: &str) -> Self {
        let lowered = stderr.to_lowercase();
        STDERR_PATTERNS
            .iter()
            .find(|(needle, _)| lowered.contains(needle))
            .map(|(_, category)| *category)
            .unwrap_or(CommandCategory::Generic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandCategory::NotARepository => "not-a-repository",
            CommandCategory::PermissionDenied => "permission",
            CommandCategory::Rejected => "rejected",
            CommandCategory::Conflict => "conflict",
            CommandCategory::NothingToCommit => "nothing-to-commit",
            CommandCategory::NoUpstream => "no-upstream",
            CommandCategory::RemoteUnavailable => "remote-unavailable",
            CommandCategory::PathspecNoMatch => "pathspec",
            CommandCategory::EmptyHistory => "empty-history",
            CommandCategory::Generic => "generic",
        }
    }

    /// One-line hint shown alongside the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            CommandCategory::NotARepository => {
                Some("Run git-acp from inside a git repository, or run 'git init' first.")
            }
            CommandCategory::PermissionDenied => {
                Some("Check file permissions and your credentials for the remote.")
            }
            CommandCategory::Rejected => {
                Some("The remote has changes you don't have yet. Pull them first, then push again.")
            }
            CommandCategory::Conflict => Some("Resolve the conflicts, then try again."),
            CommandCategory::NothingToCommit => {
                Some("Make some changes, or check that the selected files are not ignored.")
            }
            CommandCategory::NoUpstream => {
                Some("Set an upstream with 'git push --set-upstream <remote> <branch>'.")
            }
            CommandCategory::RemoteUnavailable => {
                Some("Check the remote URL with 'git remote -v' and your network connection.")
            }
            CommandCategory::PathspecNoMatch => {
                Some("Check the file paths; run 'git status' to see what changed.")
            }
            CommandCategory::EmptyHistory | CommandCategory::Generic => None,
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from running git.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("git not found. Install git and make sure it is on your PATH")]
    NotInstalled,

    #[error("Failed to spawn git: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("git {command} failed ({category}): {stderr}")]
    Failed {
        command: String,
        category: CommandCategory,
        stderr: String,
        exit_code: Option<i32>,
    },
}

impl CommandError {
    pub fn failed(args: &[&str], stderr: &str, exit_code: Option<i32>) -> Self {
        let stderr = stderr.trim().to_string();
        CommandError::Failed {
            command: args.join(" "),
            category: CommandCategory::from_stderr(&stderr),
            stderr,
            exit_code,
        }
    }

    pub fn category(&self) -> CommandCategory {
        match self {
            CommandError::Failed { category, .. } => *category,
            CommandError::NotInstalled | CommandError::Spawn(_) => CommandCategory::Generic,
        }
    }
}

/// Errors from the path pattern tables.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("Invalid path pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("Invalid keyword table for {commit_type}: {source}")]
    InvalidKeywords {
        commit_type: String,
        #[source]
        source: regex_lite::Error,
    },
}

/// Errors from commit type classification.
#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Failed to read diff for classification: {0}")]
    Diff(#[source] CommandError),
}

/// Errors from the AI chat-completion client.
#[derive(Error, Debug)]
pub enum AiError {
    #[error("AI request timed out after {0} seconds")]
    Timeout(u64),

    #[error("AI request cancelled")]
    Cancelled,

    #[error("Could not connect to any AI endpoint: {}", format_attempts(.attempts))]
    ConnectionFailed { attempts: Vec<EndpointFailure> },

    #[error("AI returned an empty response")]
    EmptyResponse,

    #[error("AI endpoint returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("AI request failed: {0}")]
    Request(String),

    #[error("No AI endpoint configured")]
    NoEndpoint,
}

/// One endpoint that could not be reached.
#[derive(Debug, Clone)]
pub struct EndpointFailure {
    pub url: String,
    pub reason: String,
}

fn format_attempts(attempts: &[EndpointFailure]) -> String {
    attempts
        .iter()
        .map(|a| format!("{} ({})", a.url, a.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from prompt construction.
#[derive(Error, Debug)]
pub enum PromptError {
    #[error(
        "Context window too small: the prompt template needs {required} tokens but only {available} are available for input"
    )]
    BudgetTooSmall { required: usize, available: usize },
}

/// Errors from generating a commit message with AI.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to gather repository context: {0}")]
    Context(#[source] CommandError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Ai(#[from] AiError),
}

/// Errors from GitHub API operations.
#[derive(Error, Debug)]
pub enum GitHubError {
    #[error(
        "GitHub authentication failed: no token found. Set GITHUB_TOKEN or GH_TOKEN, or run 'gh auth login'"
    )]
    AuthenticationFailed,

    #[error("Remote URL '{0}' does not point at a GitHub repository")]
    InvalidRepositoryUrl(String),

    #[error("Repository not found: {owner}/{repo}")]
    RepositoryNotFound { owner: String, repo: String },

    #[error("Rate limited by GitHub API")]
    RateLimited,

    #[error("GitHub rejected the pull request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to create pull request: {0}")]
    Request(#[source] Box<octocrab::Error>),
}

/// Errors from opening a pull request.
#[derive(Error, Debug)]
pub enum PrError {
    #[error("Failed to compare branches: {0}")]
    Git(#[source] CommandError),

    #[error("{head} has no commits that are not already on {base}")]
    NoCommits { base: String, head: String },

    #[error("Failed to generate the pull request description: {0}")]
    Generation(#[source] AiError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),
}

impl PrError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PrError::Generation(AiError::Cancelled))
    }

    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            PrError::Git(source) => source.category().suggestion(),
            PrError::NoCommits { .. } => {
                Some("Commit and push your work on the source branch, or pick another target.")
            }
            PrError::GitHub(GitHubError::RepositoryNotFound { .. }) => {
                Some("Check the remote URL and that your token can see the repository.")
            }
            _ => None,
        }
    }
}

/// Errors from the interactive collaborator.
#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Input cancelled")]
    Cancelled,

    #[error("Terminal interaction failed: {0}")]
    Io(String),
}

/// Errors from loading settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file {path}: {message}")]
    ConfigFile { path: String, message: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Human-readable category attached to every workflow abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    Declined,
    Cancelled,
    NothingToCommit,
    StagingNotEmpty,
    StepFailed,
    PushFailed,
}

impl AbortKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AbortKind::Declined => "declined",
            AbortKind::Cancelled => "cancelled",
            AbortKind::NothingToCommit => "nothing-to-commit",
            AbortKind::StagingNotEmpty => "staging-not-empty",
            AbortKind::StepFailed => "step-failed",
            AbortKind::PushFailed => "push-failed",
        }
    }
}

impl fmt::Display for AbortKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a workflow run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Commit cancelled by user")]
    Declined,

    #[error("Nothing to commit: {0}")]
    NothingToCommit(String),

    #[error("No commit message provided. Pass one with -m, or use --ai to generate it")]
    MissingMessage,

    #[error(
        "The staging area already contains files: {}. Commit or unstage them first",
        .0.join(", ")
    )]
    StagingNotEmpty(Vec<String>),

    #[error("Failed to {}: {source}", .state.step_name())]
    Command {
        state: WorkflowState,
        #[source]
        source: CommandError,
    },

    #[error("Failed to generate commit message: {0}")]
    Generation(#[source] GenerationError),

    #[error(transparent)]
    Classification(#[from] ClassificationError),

    #[error(transparent)]
    Interaction(InteractionError),

    #[error(
        "Commit {commit} was created locally, but pushing to {branch} failed: {source}"
    )]
    PushFailed {
        commit: String,
        branch: String,
        #[source]
        source: CommandError,
    },

    #[error("Commit {commit} was created locally; push to {branch} was cancelled")]
    PushCancelled { commit: String, branch: String },
}

impl WorkflowError {
    pub fn kind(&self) -> AbortKind {
        match self {
            WorkflowError::Cancelled => AbortKind::Cancelled,
            WorkflowError::Declined => AbortKind::Declined,
            WorkflowError::NothingToCommit(_) | WorkflowError::MissingMessage => {
                AbortKind::NothingToCommit
            }
            WorkflowError::StagingNotEmpty(_) => AbortKind::StagingNotEmpty,
            WorkflowError::Command { source, .. }
                if source.category() == CommandCategory::NothingToCommit =>
            {
                AbortKind::NothingToCommit
            }
            WorkflowError::Interaction(InteractionError::Cancelled) => AbortKind::Cancelled,
            WorkflowError::Command { .. }
            | WorkflowError::Generation(_)
            | WorkflowError::Classification(_)
            | WorkflowError::Interaction(_) => AbortKind::StepFailed,
            WorkflowError::PushFailed { .. } | WorkflowError::PushCancelled { .. } => {
                AbortKind::PushFailed
            }
        }
    }

    /// True when the local commit exists and only the push is outstanding.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == AbortKind::PushFailed
    }

    /// The commit hash, when the failure happened after committing.
    pub fn commit(&self) -> Option<&str> {
        match self {
            WorkflowError::PushFailed { commit, .. } | WorkflowError::PushCancelled { commit, .. } => {
                Some(commit)
            }
            _ => None,
        }
    }

    /// Guidance for the underlying git failure, if any.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            WorkflowError::Command { source, .. } | WorkflowError::PushFailed { source, .. } => {
                source.category().suggestion()
            }
            WorkflowError::Generation(GenerationError::Context(source)) => {
                source.category().suggestion()
            }
            _ => None,
        }
    }
}

impl From<InteractionError> for WorkflowError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::Cancelled => WorkflowError::Cancelled,
            other => WorkflowError::Interaction(other),
        }
    }
}
