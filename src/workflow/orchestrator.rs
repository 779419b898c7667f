//! The add-commit-push state machine.
//!
//! A run walks `Start -> FilesSelected -> BranchResolved -> Staged ->
//! MessageReady -> TypeResolved -> Confirmed -> Committed -> Pushed -> Done`.
//! Any step can abort. Aborting before `Committed` clears whatever this run
//! staged; after `Committed` the commit is kept and the error says so.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::{Classifier, CommitType};
use crate::config::Settings;
use crate::error::{AiError, CommandError, GenerationError, WorkflowError};
use crate::git::{CommandRunner, GitRepo};
use crate::llm::{ChatBackend, generate_commit_message};
use crate::workflow::config::{FileSpec, WorkflowConfig};
use crate::workflow::format::format_commit_message;
use crate::workflow::interaction::Interaction;
use crate::workflow::state::WorkflowState;

/// The collaborators a run works with. Cheap to clone; shared by every
/// group of a batch run.
pub struct WorkflowEnv<'a, R> {
    pub repo: &'a GitRepo<R>,
    pub settings: &'a Settings,
    pub classifier: &'a Classifier,
    pub interaction: &'a dyn Interaction,
    /// None when AI generation is unavailable.
    pub backend: Option<&'a dyn ChatBackend>,
    pub cancel: CancellationToken,
}

impl<R> Clone for WorkflowEnv<'_, R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo,
            settings: self.settings,
            classifier: self.classifier,
            interaction: self.interaction,
            backend: self.backend,
            cancel: self.cancel.clone(),
        }
    }
}

/// What a finished run did (or, for a dry run, would have done).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutcome {
    pub state: WorkflowState,
    pub files: Vec<String>,
    pub branch: String,
    pub commit_type: CommitType,
    /// The final, formatted commit message.
    pub message: String,
    /// None for dry runs.
    pub commit: Option<String>,
    pub dry_run: bool,
}

/// One add-commit-push run.
pub struct Workflow<'a, R> {
    env: WorkflowEnv<'a, R>,
    config: &'a WorkflowConfig,
    state: WorkflowState,
    /// Set once this run has touched the index.
    staged_by_us: bool,
}

impl<'a, R: CommandRunner> Workflow<'a, R> {
    pub fn new(env: WorkflowEnv<'a, R>, config: &'a WorkflowConfig) -> Self {
        Self {
            env,
            config,
            state: WorkflowState::Start,
            staged_by_us: false,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Drive the run to `Done`, or abort and clean up.
    pub async fn run(mut self) -> Result<WorkflowOutcome, WorkflowError> {
        match self.drive().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let reached = self.state;
                self.state = WorkflowState::Aborted;
                if self.staged_by_us && !reached.has_committed() {
                    self.unstage_after_abort();
                }
                debug!("Workflow aborted after {}: {}", reached, err);
                Err(err)
            }
        }
    }

    async fn drive(&mut self) -> Result<WorkflowOutcome, WorkflowError> {
        self.ensure_staging_empty()?;

        self.checkpoint()?;
        let files = self.select_files()?;
        self.advance(WorkflowState::FilesSelected);

        self.checkpoint()?;
        let branch = self.resolve_branch()?;
        self.advance(WorkflowState::BranchResolved);

        self.checkpoint()?;
        let staged = self.stage(&files)?;
        self.advance(WorkflowState::Staged);

        self.checkpoint()?;
        let message = self.resolve_message().await?;
        self.advance(WorkflowState::MessageReady);

        self.checkpoint()?;
        let commit_type = self.resolve_type(&message, &staged)?;
        self.advance(WorkflowState::TypeResolved);
        let message = format_commit_message(commit_type, &message);

        self.checkpoint()?;
        self.confirm(&staged, &branch, &message)?;
        self.advance(WorkflowState::Confirmed);

        let mut outcome = WorkflowOutcome {
            state: self.state,
            files: staged,
            branch,
            commit_type,
            message,
            commit: None,
            dry_run: self.config.dry_run,
        };

        if self.config.dry_run {
            self.env
                .repo
                .unstage_all()
                .map_err(|source| step_failed(WorkflowState::Done, source))?;
            self.staged_by_us = false;
            self.env
                .interaction
                .notify("Dry run: nothing was committed or pushed, and the files were unstaged.");
            return Ok(outcome);
        }

        self.checkpoint()?;
        let commit = self
            .env
            .repo
            .commit(&outcome.message)
            .map_err(|source| step_failed(WorkflowState::Committed, source))?;
        self.advance(WorkflowState::Committed);
        outcome.commit = Some(commit.clone());
        self.env.interaction.notify(&format!(
            "Committed {} ({} files)",
            short(&commit),
            outcome.files.len()
        ));

        if self.env.cancel.is_cancelled() {
            return Err(WorkflowError::PushCancelled {
                commit,
                branch: outcome.branch,
            });
        }

        let settings = self.env.settings;
        let remote = &settings.git.remote;
        if let Err(source) = self.env.repo.push(remote, &outcome.branch) {
            return Err(WorkflowError::PushFailed {
                commit,
                branch: outcome.branch,
                source,
            });
        }
        self.advance(WorkflowState::Pushed);
        self.env
            .interaction
            .notify(&format!("Pushed to {}/{}", remote, outcome.branch));

        self.advance(WorkflowState::Done);
        outcome.state = self.state;
        info!("Workflow done: {} on {}", short(&commit), outcome.branch);
        Ok(outcome)
    }

    fn advance(&mut self, next: WorkflowState) {
        debug_assert_eq!(self.state.next(), Some(next), "out-of-order transition");
        debug!("Workflow {} -> {}", self.state, next);
        self.state = next;
    }

    fn checkpoint(&self) -> Result<(), WorkflowError> {
        if self.env.cancel.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }

    /// Refuse to run on top of staging done by someone else, so a later
    /// cleanup can never unstage their work.
    fn ensure_staging_empty(&self) -> Result<(), WorkflowError> {
        let staged = self
            .env
            .repo
            .staged_paths()
            .map_err(|source| step_failed(WorkflowState::Start, source))?;
        if !staged.is_empty() {
            return Err(WorkflowError::StagingNotEmpty(staged));
        }
        Ok(())
    }

    fn select_files(&self) -> Result<Vec<String>, WorkflowError> {
        let changes = self
            .env
            .repo
            .changed_files(false)
            .map_err(|source| step_failed(WorkflowState::FilesSelected, source))?;

        let spec = match &self.config.files {
            FileSpec::Unspecified => {
                if changes.is_empty() {
                    return Err(WorkflowError::NothingToCommit(
                        "the working tree has no changes".into(),
                    ));
                }
                self.env.interaction.select_files(&changes)?
            }
            other => other.clone(),
        };

        let files = spec.resolve(&changes);
        if files.is_empty() {
            return Err(WorkflowError::NothingToCommit("no files selected".into()));
        }
        debug!("Selected {} files", files.len());
        Ok(files)
    }

    fn resolve_branch(&self) -> Result<String, WorkflowError> {
        if let Some(branch) = self
            .config
            .branch
            .as_ref()
            .or(self.env.settings.git.default_branch.as_ref())
        {
            return Ok(branch.clone());
        }
        self.env
            .repo
            .current_branch()
            .map_err(|source| step_failed(WorkflowState::BranchResolved, source))
    }

    /// Stage `files` and return what actually landed in the index.
    fn stage(&mut self, files: &[String]) -> Result<Vec<String>, WorkflowError> {
        self.staged_by_us = true;
        self.env
            .repo
            .stage(files)
            .map_err(|source| step_failed(WorkflowState::Staged, source))?;

        let staged = self
            .env
            .repo
            .staged_paths()
            .map_err(|source| step_failed(WorkflowState::Staged, source))?;
        if staged.is_empty() {
            return Err(WorkflowError::NothingToCommit(
                "the selected files have no changes to stage".into(),
            ));
        }
        Ok(staged)
    }

    async fn resolve_message(&self) -> Result<String, WorkflowError> {
        let supplied = self.config.message.trim();
        let mut message = if !supplied.is_empty() {
            supplied.to_string()
        } else if self.config.use_ai {
            self.generate_message().await?
        } else {
            self.manual_message()?
        };

        if self.config.interactive_edit {
            let edited = self.env.interaction.edit_message(&message)?;
            if !edited.trim().is_empty() {
                message = edited.trim().to_string();
            }
        }
        Ok(message)
    }

    /// Ask the AI backend. On failure, offer manual entry unless running
    /// without prompts.
    async fn generate_message(&self) -> Result<String, WorkflowError> {
        let result = match self.env.backend {
            Some(backend) => {
                self.env.interaction.notify("Generating commit message...");
                generate_commit_message(
                    self.env.repo,
                    backend,
                    self.env.settings,
                    self.config.prompt_mode,
                    &self.config.ai,
                    &self.env.cancel,
                )
                .await
            }
            None => Err(GenerationError::Ai(AiError::NoEndpoint)),
        };

        match result {
            Ok(message) => Ok(message),
            Err(GenerationError::Ai(AiError::Cancelled)) => Err(WorkflowError::Cancelled),
            Err(err) => {
                warn!("AI generation failed: {}", err);
                if self.config.skip_confirmation {
                    return Err(WorkflowError::Generation(err));
                }
                self.env
                    .interaction
                    .notify(&format!("Could not generate a commit message: {err}"));
                if !self
                    .env
                    .interaction
                    .confirm("Enter the commit message manually instead?")?
                {
                    return Err(WorkflowError::Generation(err));
                }
                self.manual_message()
            }
        }
    }

    fn manual_message(&self) -> Result<String, WorkflowError> {
        match self.env.interaction.prompt_message()? {
            Some(message) if !message.trim().is_empty() => Ok(message.trim().to_string()),
            _ => Err(WorkflowError::MissingMessage),
        }
    }

    fn resolve_type(&self, message: &str, staged: &[String]) -> Result<CommitType, WorkflowError> {
        if let Some(commit_type) = self.config.commit_type {
            return Ok(commit_type);
        }
        let suggested = self
            .env
            .classifier
            .classify(Some(message), staged, self.env.repo)?
            .commit_type;
        if self.config.skip_confirmation {
            return Ok(suggested);
        }
        Ok(self.env.interaction.select_commit_type(suggested)?)
    }

    fn confirm(&self, files: &[String], branch: &str, message: &str) -> Result<(), WorkflowError> {
        let summary = format!(
            "Files ({}): {}\nBranch: {}\nMessage:\n{}",
            files.len(),
            files.join(", "),
            branch,
            message
        );

        if self.config.skip_confirmation {
            if self.config.verbose || self.config.dry_run {
                self.env.interaction.notify(&summary);
            }
            return Ok(());
        }

        self.env.interaction.notify(&summary);
        if !self.env.interaction.confirm("Commit and push these changes?")? {
            return Err(WorkflowError::Declined);
        }
        Ok(())
    }

    fn unstage_after_abort(&self) {
        match self.env.repo.unstage_all() {
            Ok(()) => debug!("Unstaged files after abort"),
            Err(e) => {
                warn!("Failed to unstage files after abort: {}", e);
                self.env
                    .interaction
                    .notify("Warning: could not unstage files. Run 'git reset' to clear the index.");
            }
        }
    }
}

fn step_failed(step: WorkflowState, source: CommandError) -> WorkflowError {
    WorkflowError::Command {
        state: step,
        source,
    }
}

fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AbortKind;
    use crate::git::testing::FakeRunner;
    use crate::llm::client::MockChatBackend;
    use crate::pattern::PathMatcher;
    use crate::workflow::interaction::MockInteraction;
    use mockall::predicate::eq;

    const STATUS: &str = " M src/lib.rs\0?? docs/guide.md\0";
    const STAGED: &str = "M\0src/lib.rs\0A\0docs/guide.md\0";
    const HASH: &str = "0123456789abcdef0123456789abcdef01234567";

    /// A repository with two changes, an empty index at start and both
    /// files staged afterwards.
    fn runner() -> FakeRunner {
        FakeRunner::new()
            .on("status --porcelain", STATUS)
            .on("diff --cached --name-status", "")
            .on("diff --cached --name-status", STAGED)
            .on("symbolic-ref", "main\n")
            .on("rev-parse HEAD", &format!("{HASH}\n"))
    }

    fn quiet() -> MockInteraction {
        let mut ui = MockInteraction::new();
        ui.expect_notify().return_const(());
        ui
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            files: FileSpec::All,
            message: "add parser".into(),
            skip_confirmation: true,
            ..Default::default()
        }
    }

    async fn run(
        repo: &GitRepo<FakeRunner>,
        ui: &MockInteraction,
        backend: Option<&dyn ChatBackend>,
        config: &WorkflowConfig,
        cancel: CancellationToken,
    ) -> Result<WorkflowOutcome, WorkflowError> {
        let settings = Settings::default();
        let classifier = Classifier::with_defaults().unwrap();
        let env = WorkflowEnv {
            repo,
            settings: &settings,
            classifier: &classifier,
            interaction: ui,
            backend,
            cancel,
        };
        Workflow::new(env, config).run().await
    }

    #[tokio::test]
    async fn test_happy_path_commits_and_pushes() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let ui = quiet();
        let config = WorkflowConfig {
            commit_type: Some(CommitType::Feat),
            ..config()
        };

        let outcome = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, WorkflowState::Done);
        assert_eq!(outcome.branch, "main");
        assert_eq!(outcome.message, "feat ✨: add parser");
        assert_eq!(outcome.commit.as_deref(), Some(HASH));
        assert_eq!(outcome.files, vec!["docs/guide.md", "src/lib.rs"]);
        let calls = repo.runner().calls();
        assert!(calls.contains(&"add -A -- docs/guide.md src/lib.rs".to_string()));
        assert!(calls.contains(&"commit -q -m feat ✨: add parser".to_string()));
        assert!(calls.contains(&"push origin main".to_string()));
        assert!(!repo.runner().called("reset"));
    }

    #[tokio::test]
    async fn test_existing_staging_aborts_without_touching_index() {
        let runner = FakeRunner::new().on("diff --cached --name-status", "M\0other.rs\0");
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ui = MockInteraction::new();

        let err = run(&repo, &ui, None, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(&err, WorkflowError::StagingNotEmpty(paths) if paths == &["other.rs"]));
        assert!(!repo.runner().called("add"));
        assert!(!repo.runner().called("reset"));
    }

    #[tokio::test]
    async fn test_dry_run_unstages_and_does_not_commit() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let ui = quiet();
        let config = WorkflowConfig {
            dry_run: true,
            ..config()
        };

        let outcome = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.dry_run);
        assert_eq!(outcome.state, WorkflowState::Confirmed);
        assert_eq!(outcome.commit, None);
        assert!(repo.runner().called("reset -q HEAD"));
        assert!(!repo.runner().called("commit"));
        assert!(!repo.runner().called("push"));
    }

    #[tokio::test]
    async fn test_push_failure_keeps_commit() {
        let runner = runner().fail("push", "error: failed to push some refs\n ! [rejected]");
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ui = quiet();

        let err = run(&repo, &ui, None, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AbortKind::PushFailed);
        assert!(err.is_recoverable());
        assert_eq!(err.commit(), Some(HASH));
        assert!(err.suggestion().is_some());
        assert!(!repo.runner().called("reset"));
    }

    #[tokio::test]
    async fn test_commit_failure_unstages() {
        let runner = runner().fail("commit", "fatal: unable to write new index file");
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ui = quiet();

        let err = run(&repo, &ui, None, &config(), CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WorkflowError::Command { state: WorkflowState::Committed, .. }
        ));
        assert!(repo.runner().called("reset -q HEAD"));
    }

    #[tokio::test]
    async fn test_missing_message_without_ai_unstages() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_prompt_message().times(1).returning(|| Ok(None));
        let config = WorkflowConfig {
            message: String::new(),
            ..config()
        };

        let err = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::MissingMessage));
        assert!(repo.runner().called("reset -q HEAD"));
        assert!(!repo.runner().called("commit"));
    }

    #[tokio::test]
    async fn test_interactive_edit_replaces_message() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_edit_message()
            .withf(|message| message == "add parser")
            .times(1)
            .returning(|_| Ok("  fix: reject empty input  ".into()));
        let config = WorkflowConfig {
            interactive_edit: true,
            ..config()
        };

        let outcome = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.commit_type, CommitType::Fix);
        assert_eq!(outcome.message, "fix 🐛: reject empty input");
    }

    #[tokio::test]
    async fn test_blank_edit_keeps_original_message() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_edit_message()
            .times(1)
            .returning(|_| Ok("   ".into()));
        let config = WorkflowConfig {
            message: "docs: explain setup".into(),
            interactive_edit: true,
            ..config()
        };

        let outcome = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.message, "docs 📝: explain setup");
        assert!(
            repo.runner()
                .calls()
                .contains(&"commit -q -m docs 📝: explain setup".to_string())
        );
    }

    #[tokio::test]
    async fn test_declined_confirmation_unstages() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_select_commit_type()
            .with(eq(CommitType::Feat))
            .returning(|ty| Ok(ty));
        ui.expect_confirm().times(1).returning(|_| Ok(false));
        let config = WorkflowConfig {
            message: "feat: add parser".into(),
            skip_confirmation: false,
            ..config()
        };

        let err = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AbortKind::Declined);
        assert!(repo.runner().called("reset -q HEAD"));
    }

    #[tokio::test]
    async fn test_ai_message_is_used_and_classified() {
        let runner = runner().on("diff --cached --no-color", "+++ b/src/lib.rs\n+fn parse() {}\n");
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ui = quiet();
        let mut backend = MockChatBackend::new();
        backend
            .expect_chat_completion()
            .times(1)
            .returning(|_, _| Ok("fix(parser): handle empty input".into()));
        let config = WorkflowConfig {
            message: String::new(),
            use_ai: true,
            prompt_mode: crate::llm::PromptMode::Simple,
            ..config()
        };

        let outcome = run(&repo, &ui, Some(&backend), &config, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.commit_type, CommitType::Fix);
        assert_eq!(outcome.message, "fix 🐛(parser): handle empty input");
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_manual_entry() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_confirm()
            .withf(|question| question.contains("manually"))
            .times(1)
            .returning(|_| Ok(true));
        ui.expect_prompt_message()
            .times(1)
            .returning(|| Ok(Some("docs: explain setup".into())));
        ui.expect_select_commit_type().returning(|ty| Ok(ty));
        ui.expect_confirm()
            .withf(|question| question.starts_with("Commit and push"))
            .returning(|_| Ok(true));
        let mut backend = MockChatBackend::new();
        backend
            .expect_chat_completion()
            .returning(|_, _| Err(AiError::EmptyResponse));
        let config = WorkflowConfig {
            message: String::new(),
            use_ai: true,
            skip_confirmation: false,
            prompt_mode: crate::llm::PromptMode::Simple,
            ..config()
        };

        let outcome = run(&repo, &ui, Some(&backend), &config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.message, "docs 📝: explain setup");
    }

    #[tokio::test]
    async fn test_ai_failure_without_prompts_aborts() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let ui = quiet();
        let mut backend = MockChatBackend::new();
        backend
            .expect_chat_completion()
            .returning(|_, _| Err(AiError::Timeout(120)));
        let config = WorkflowConfig {
            message: String::new(),
            use_ai: true,
            prompt_mode: crate::llm::PromptMode::Simple,
            ..config()
        };

        let err = run(&repo, &ui, Some(&backend), &config, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Generation(GenerationError::Ai(AiError::Timeout(120)))
        ));
        assert!(repo.runner().called("reset -q HEAD"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start_does_nothing() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let ui = quiet();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run(&repo, &ui, None, &config(), cancel).await.unwrap_err();
        assert_eq!(err.kind(), AbortKind::Cancelled);
        assert!(!repo.runner().called("add"));
        assert!(!repo.runner().called("reset"));
    }

    #[tokio::test]
    async fn test_no_changes_is_nothing_to_commit() {
        let runner = FakeRunner::new().on("status --porcelain", "");
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ui = MockInteraction::new();
        let config = WorkflowConfig {
            files: FileSpec::Unspecified,
            ..config()
        };

        let err = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), AbortKind::NothingToCommit);
    }

    #[tokio::test]
    async fn test_interactive_file_selection() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let mut ui = quiet();
        ui.expect_select_files()
            .withf(|changes| changes.len() == 2)
            .times(1)
            .returning(|_| Ok(FileSpec::Paths(vec!["src/lib.rs".into()])));
        let config = WorkflowConfig {
            files: FileSpec::Unspecified,
            ..config()
        };

        run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();
        assert!(
            repo.runner()
                .calls()
                .contains(&"add -A -- src/lib.rs".to_string())
        );
    }

    #[tokio::test]
    async fn test_configured_branch_skips_lookup() {
        let repo = GitRepo::new(runner(), PathMatcher::empty());
        let ui = quiet();
        let config = WorkflowConfig {
            branch: Some("release".into()),
            ..config()
        };

        let outcome = run(&repo, &ui, None, &config, CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.branch, "release");
        assert!(!repo.runner().called("symbolic-ref"));
        assert!(repo.runner().called("push origin release"));
    }
}
