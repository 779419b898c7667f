//! End-to-end workflow runs against real repositories and the git CLI.

mod common;

use common::{Harness, TestRepo};
use git_acp::classify::{CommitType, parse_prefix};
use git_acp::error::{AbortKind, CommandCategory, WorkflowError};
use git_acp::workflow::{
    FileSpec, TerminalInteraction, Workflow, WorkflowConfig, WorkflowEnv, WorkflowState,
    group_by_directory, run_batch,
};
use tokio_util::sync::CancellationToken;

fn auto_config(message: &str) -> WorkflowConfig {
    WorkflowConfig {
        files: FileSpec::All,
        message: message.to_string(),
        skip_confirmation: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_commit_and_push_to_bare_remote() {
    let repo = TestRepo::with_initial_commit();
    let (_remote_dir, bare) = repo.add_bare_remote();
    repo.write("src/lib.rs", "pub fn parse() {}\n");

    let harness = Harness::new(&repo);
    let config = auto_config("feat: add parser");
    let outcome = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.state, WorkflowState::Done);
    assert_eq!(outcome.branch, "main");
    assert_eq!(outcome.commit_type, CommitType::Feat);
    assert_eq!(repo.commit_count(), 2);
    assert_eq!(repo.head_message().trim(), "feat ✨: add parser");

    let pushed = bare.find_reference("refs/heads/main").unwrap();
    assert_eq!(pushed.target().unwrap().to_string(), repo.head_id());
    assert_eq!(outcome.commit.as_deref(), Some(repo.head_id().as_str()));
    assert!(repo.staged().is_empty());
}

#[tokio::test]
async fn test_dry_run_leaves_no_commit_and_empty_index() {
    let repo = TestRepo::with_initial_commit();
    repo.write("notes.txt", "remember\n");

    let harness = Harness::new(&repo);
    let config = WorkflowConfig {
        dry_run: true,
        ..auto_config("add notes")
    };
    let outcome = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap();

    assert!(outcome.dry_run);
    assert_eq!(outcome.commit, None);
    assert_eq!(outcome.files, vec!["notes.txt"]);
    assert_eq!(repo.commit_count(), 1);
    assert!(repo.staged().is_empty());
    assert!(repo.path().join("notes.txt").exists());
}

#[tokio::test]
async fn test_dry_run_in_repository_without_commits() {
    let repo = TestRepo::new();
    repo.write("a.txt", "first\n");

    let harness = Harness::new(&repo);
    let config = WorkflowConfig {
        dry_run: true,
        branch: Some("main".into()),
        ..auto_config("initial import")
    };
    let outcome = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.files, vec!["a.txt"]);
    assert_eq!(repo.commit_count(), 0);
    assert!(repo.staged().is_empty());
}

#[tokio::test]
async fn test_push_failure_keeps_local_commit() {
    let repo = TestRepo::with_initial_commit();
    repo.add_missing_remote();
    repo.write("src/fix.rs", "fn fixed() {}\n");

    let harness = Harness::new(&repo);
    let config = auto_config("fix: handle missing file");
    let err = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AbortKind::PushFailed);
    assert!(err.is_recoverable());
    assert!(err.to_string().contains("created locally"));
    match &err {
        WorkflowError::PushFailed { commit, branch, source } => {
            assert_eq!(commit, &repo.head_id());
            assert_eq!(branch, "main");
            assert_eq!(source.category(), CommandCategory::RemoteUnavailable);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(repo.commit_count(), 2);
    assert!(repo.head_message().starts_with("fix 🐛: handle missing file"));
}

#[tokio::test]
async fn test_missing_message_without_ai_unstages() {
    let repo = TestRepo::with_initial_commit();
    repo.write("docs/readme.md", "# Docs\n");

    let harness = Harness::new(&repo);
    let config = WorkflowConfig {
        files: FileSpec::Paths(vec!["docs/readme.md".into()]),
        ..Default::default()
    };
    let err = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, WorkflowError::MissingMessage));
    assert_eq!(err.kind(), AbortKind::NothingToCommit);
    assert!(repo.staged().is_empty());
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_missing_message_without_terminal_is_nothing_to_commit() {
    let repo = TestRepo::with_initial_commit();
    repo.write("docs/readme.md", "# Docs\n");

    let harness = Harness::new(&repo);
    let detached = TerminalInteraction::with_terminal(false);
    let env = WorkflowEnv {
        interaction: &detached,
        ..harness.env(None, CancellationToken::new())
    };
    let config = WorkflowConfig {
        files: FileSpec::Paths(vec!["docs/readme.md".into()]),
        ..Default::default()
    };
    let err = Workflow::new(env, &config).run().await.unwrap_err();

    assert!(matches!(err, WorkflowError::MissingMessage));
    assert_eq!(err.kind(), AbortKind::NothingToCommit);
    assert!(repo.staged().is_empty());
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_declined_confirmation_unstages_and_keeps_files() {
    let repo = TestRepo::with_initial_commit();
    repo.write("tests/parser_test.rs", "#[test]\nfn parses() {}\n");

    let mut harness = Harness::new(&repo);
    harness.ui.confirm = false;
    let config = WorkflowConfig {
        skip_confirmation: false,
        ..auto_config("cover the parser")
    };
    let err = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), AbortKind::Declined);
    assert!(repo.staged().is_empty());
    assert!(repo.path().join("tests/parser_test.rs").exists());
    assert_eq!(repo.commit_count(), 1);
}

#[tokio::test]
async fn test_existing_staged_files_are_left_alone() {
    let repo = TestRepo::with_initial_commit();
    repo.write("wip.txt", "someone else's work\n");
    repo.stage("wip.txt");
    repo.write("mine.txt", "mine\n");

    let harness = Harness::new(&repo);
    let config = WorkflowConfig {
        files: FileSpec::Paths(vec!["mine.txt".into()]),
        ..auto_config("add mine")
    };
    let err = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(&err, WorkflowError::StagingNotEmpty(paths) if paths == &["wip.txt"]));
    assert_eq!(repo.staged(), vec!["wip.txt"]);
}

#[tokio::test]
async fn test_chosen_type_round_trips_through_commit() {
    for commit_type in [CommitType::Docs, CommitType::Refactor, CommitType::Revert] {
        let repo = TestRepo::with_initial_commit();
        let (_remote_dir, _bare) = repo.add_bare_remote();
        repo.write("src/lib.rs", "// change\n");

        let harness = Harness::new(&repo);
        let config = WorkflowConfig {
            commit_type: Some(commit_type),
            ..auto_config("touch lib")
        };
        Workflow::new(harness.env(None, CancellationToken::new()), &config)
            .run()
            .await
            .unwrap();

        assert_eq!(parse_prefix(&repo.head_message()), Some(commit_type));
    }
}

#[tokio::test]
async fn test_excluded_files_are_not_staged_by_all() {
    let repo = TestRepo::with_initial_commit();
    let (_remote_dir, _bare) = repo.add_bare_remote();
    repo.write("app.py", "print('hi')\n");
    repo.write("__pycache__/app.cpython-312.pyc", "junk");

    let mut harness = Harness::new(&repo);
    harness.git = git_acp::git::GitRepo::new(
        git_acp::git::GitCommand::new(repo.path()),
        git_acp::pattern::PathMatcher::new(&harness.settings.git.excluded_patterns).unwrap(),
    );
    let config = auto_config("add app");
    let outcome = Workflow::new(harness.env(None, CancellationToken::new()), &config)
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.files, vec!["app.py"]);
}

#[tokio::test]
async fn test_batch_commits_each_directory_separately() {
    let repo = TestRepo::with_initial_commit();
    let (_remote_dir, _bare) = repo.add_bare_remote();
    repo.write("docs/guide.md", "# Guide\n");
    repo.write("src/main.rs", "fn main() {}\n");

    let harness = Harness::new(&repo);
    let base = auto_config("update");
    let files = vec!["docs/guide.md".to_string(), "src/main.rs".to_string()];
    let report = run_batch(
        &harness.env(None, CancellationToken::new()),
        &base,
        group_by_directory(&files),
    )
    .await
    .unwrap();

    assert!(report.is_success());
    assert_eq!(repo.commit_count(), 3);
    let docs = report.groups[0].result.as_ref().unwrap();
    assert_eq!(docs.files, vec!["docs/guide.md"]);
    assert_eq!(docs.commit_type, CommitType::Docs);
    let src = report.groups[1].result.as_ref().unwrap();
    assert_eq!(src.files, vec!["src/main.rs"]);
    assert!(repo.staged().is_empty());
}
