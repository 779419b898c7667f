//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::path::Path;

use git2::{Oid, Repository, RepositoryInitOptions, Signature, Status};

use git_acp::classify::{Classifier, CommitType};
use git_acp::config::Settings;
use git_acp::error::InteractionError;
use git_acp::git::{ChangeSet, GitCommand, GitRepo};
use git_acp::llm::ChatBackend;
use git_acp::pattern::PathMatcher;
use git_acp::workflow::{FileSpec, Interaction, WorkflowEnv};
use tokio_util::sync::CancellationToken;

/// A throwaway git repository on `main`, with a committer identity so the
/// git CLI can commit in it.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Failed to init git repo");

        let mut config = repo.config().expect("Failed to open repo config");
        config.set_str("user.name", "Test User").unwrap();
        config.set_str("user.email", "test@example.com").unwrap();
        config.set_bool("commit.gpgsign", false).unwrap();

        Self { dir, repo }
    }

    /// A repository with one commit holding `README.md`.
    pub fn with_initial_commit() -> Self {
        let repo = Self::new();
        repo.write("README.md", "# test\n");
        repo.commit_all("chore: initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&path, content).expect("Failed to write test file");
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Stage a single path in the index without committing.
    pub fn stage(&self, rel: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(rel)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Commit every file in the working tree. Returns the commit OID.
    pub fn commit_all(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        index
            .add_all(["*"], git2::IndexAddOption::DEFAULT, None)
            .expect("Failed to add files");
        index.write().expect("Failed to write index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Number of commits reachable from HEAD (0 for an unborn branch).
    pub fn commit_count(&self) -> usize {
        let Ok(head) = self.repo.head() else {
            return 0;
        };
        let mut walk = self.repo.revwalk().unwrap();
        walk.push(head.target().unwrap()).unwrap();
        walk.count()
    }

    pub fn head_message(&self) -> String {
        let commit = self.repo.head().unwrap().peel_to_commit().unwrap();
        commit.message().unwrap_or("").to_string()
    }

    pub fn head_id(&self) -> String {
        self.repo.head().unwrap().target().unwrap().to_string()
    }

    /// Paths with staged changes, read fresh from disk.
    pub fn staged(&self) -> Vec<String> {
        let repo = Repository::open(self.path()).unwrap();
        let statuses = repo.statuses(None).unwrap();
        let staged = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;
        let mut paths: Vec<String> = statuses
            .iter()
            .filter(|s| s.status().intersects(staged))
            .filter_map(|s| s.path().map(String::from))
            .collect();
        paths.sort();
        paths
    }

    /// Create `name` at HEAD and switch to it. Later commits land on it.
    pub fn switch_to_new_branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).expect("Failed to create branch");
        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .expect("Failed to switch branch");
    }

    /// Add a bare repository as remote `origin`. Returns it.
    pub fn add_bare_remote(&self) -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let bare = Repository::init_bare(dir.path()).expect("Failed to init bare repo");
        self.repo
            .remote("origin", dir.path().to_str().unwrap())
            .expect("Failed to add remote");
        (dir, bare)
    }

    /// Add `origin` pointing at a path that does not exist.
    pub fn add_missing_remote(&self) {
        let missing = self.dir.path().join("no-such-remote.git");
        self.repo
            .remote("origin", missing.to_str().unwrap())
            .expect("Failed to add remote");
    }

    /// A [`GitRepo`] driving the git CLI in this repository.
    pub fn git(&self) -> GitRepo<GitCommand> {
        GitRepo::new(GitCommand::new(self.path()), PathMatcher::empty())
    }
}

/// Everything a workflow run borrows, owned in one place for tests.
pub struct Harness {
    pub git: GitRepo<GitCommand>,
    pub settings: Settings,
    pub classifier: Classifier,
    pub ui: ScriptedInteraction,
}

impl Harness {
    pub fn new(repo: &TestRepo) -> Self {
        Self {
            git: repo.git(),
            settings: Settings::default(),
            classifier: Classifier::with_defaults().unwrap(),
            ui: ScriptedInteraction::default(),
        }
    }

    pub fn env<'a>(
        &'a self,
        backend: Option<&'a dyn ChatBackend>,
        cancel: CancellationToken,
    ) -> WorkflowEnv<'a, GitCommand> {
        WorkflowEnv {
            repo: &self.git,
            settings: &self.settings,
            classifier: &self.classifier,
            interaction: &self.ui,
            backend,
            cancel,
        }
    }
}

/// Canned answers for every prompt; records notices.
#[derive(Default)]
pub struct ScriptedInteraction {
    pub files: Option<FileSpec>,
    pub typed_message: Option<String>,
    pub commit_type: Option<CommitType>,
    pub confirm: bool,
    pub notices: RefCell<Vec<String>>,
}

impl Interaction for ScriptedInteraction {
    fn select_files(&self, _changes: &ChangeSet) -> Result<FileSpec, InteractionError> {
        self.files.clone().ok_or(InteractionError::Cancelled)
    }

    fn edit_message(&self, message: &str) -> Result<String, InteractionError> {
        Ok(message.to_string())
    }

    fn prompt_message(&self) -> Result<Option<String>, InteractionError> {
        Ok(self.typed_message.clone())
    }

    fn select_commit_type(&self, suggested: CommitType) -> Result<CommitType, InteractionError> {
        Ok(self.commit_type.unwrap_or(suggested))
    }

    fn confirm(&self, _question: &str) -> Result<bool, InteractionError> {
        Ok(self.confirm)
    }

    fn notify(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }
}
