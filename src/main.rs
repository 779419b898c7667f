//! git-acp - CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use git_acp::classify::{Classifier, CommitType};
use git_acp::config::{Settings, config_file_path, load_config_file};
use git_acp::error::{AbortKind, PrError, WorkflowError};
use git_acp::git::{GitCommand, GitRepo, check_git_installed};
use git_acp::github::{NewPullRequest, create_pull_request, get_github_token, parse_github_remote};
use git_acp::llm::{AiClient, AiOverrides, ChatBackend, PromptMode};
use git_acp::pattern::PathMatcher;
use git_acp::pr::{BranchChanges, PrDraft, basic_draft, generate_draft};
use git_acp::workflow::{
    BatchReport, FileSpec, TerminalInteraction, Workflow, WorkflowConfig, WorkflowEnv,
    WorkflowOutcome, group_by_directory, run_batch,
};

/// Exit code for a run cancelled with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

/// Pull request target when neither --target nor GIT_ACP_DEFAULT_BRANCH is set.
const FALLBACK_TARGET: &str = "main";

/// Stage, commit and push in one step.
#[derive(Parser, Debug)]
#[command(name = "git-acp")]
#[command(about = "Stage, commit and push in one step, with optional AI-generated commit messages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Files to stage: paths, directories, globs, or "." for all changes
    #[arg(short = 'a', long = "add", num_args = 1..)]
    add: Vec<String>,

    /// Commit message (generated with --ai or prompted for when omitted)
    #[arg(short, long)]
    message: Option<String>,

    /// Branch to push to (defaults to the current branch)
    #[arg(short, long)]
    branch: Option<String>,

    /// Commit type: feat, fix, docs, style, refactor, test, chore or revert
    #[arg(short = 't', long = "type")]
    commit_type: Option<CommitType>,

    /// Generate the commit message with AI
    #[arg(short = 'o', long)]
    ai: bool,

    /// Edit the commit message before committing
    #[arg(short, long)]
    interactive: bool,

    /// AI prompt complexity: simple or advanced
    #[arg(short = 'p', long = "prompt-type")]
    prompt_type: Option<PromptMode>,

    /// Skip all confirmation prompts
    #[arg(short = 'y', long = "no-confirm")]
    no_confirm: bool,

    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Show what would be committed, then unstage without committing
    #[arg(long)]
    dry_run: bool,

    /// AI model override
    #[arg(long)]
    model: Option<String>,

    /// Context window size of the AI model, in tokens
    #[arg(long)]
    context_window: Option<usize>,

    /// Custom prompt sent to the AI instead of the generated one
    #[arg(long)]
    prompt: Option<String>,

    /// Commit each top-level directory separately
    #[arg(long)]
    auto_group: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open a GitHub pull request for a branch
    Pr(PrArgs),
}

#[derive(Args, Debug)]
struct PrArgs {
    /// Branch holding the changes (defaults to the current branch)
    #[arg(long)]
    source: Option<String>,

    /// Branch to merge into (defaults to GIT_ACP_DEFAULT_BRANCH, then main)
    #[arg(long)]
    target: Option<String>,

    /// Write the description with AI
    #[arg(short = 'o', long)]
    ai: bool,

    /// AI prompt complexity: simple or advanced
    #[arg(short = 'p', long = "prompt-type")]
    prompt_type: Option<PromptMode>,

    /// Open the pull request as a draft
    #[arg(long)]
    draft: bool,

    /// Print the title and description without opening the pull request
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn workflow_config(&self, settings: &Settings) -> WorkflowConfig {
        WorkflowConfig {
            files: FileSpec::parse(&self.add),
            message: self.message.clone().unwrap_or_default(),
            branch: self.branch.clone(),
            commit_type: self.commit_type,
            use_ai: self.ai,
            interactive_edit: self.interactive,
            skip_confirmation: self.no_confirm,
            verbose: self.verbose,
            dry_run: self.dry_run,
            prompt_mode: self.prompt_type.unwrap_or(settings.ai.prompt_mode),
            ai: AiOverrides {
                model: self.model.clone(),
                context_window: self.context_window,
                custom_prompt: self.prompt.clone(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "git_acp=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

async fn run(mut cli: Cli) -> Result<ExitCode> {
    // Step 1: Load settings (process env wins over the config file)
    if let Some(path) = config_file_path() {
        load_config_file(&path)?;
    }
    let settings = Settings::from_env();

    // Step 2: Check prerequisites
    check_git_installed().context("git is required")?;
    let workdir = std::env::current_dir().context("Cannot read the current directory")?;
    let exclusions = PathMatcher::new(&settings.git.excluded_patterns)
        .context("Invalid GIT_ACP_EXCLUDED_PATTERNS")?;
    let repo = GitRepo::new(GitCommand::new(workdir), exclusions);
    let classifier = Classifier::with_defaults().context("Invalid built-in classifier rules")?;
    let pr_args = cli.command.take().map(|Command::Pr(args)| args);
    let wants_ai = pr_args.as_ref().map_or(cli.ai, |args| args.ai);
    let client = if wants_ai {
        Some(AiClient::from_settings(&settings.ai).context("Failed to set up the AI client")?)
    } else {
        None
    };

    // Step 3: Ctrl-C cancels whatever step is running
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nCancelling...");
            on_interrupt.cancel();
        }
    });

    if let Some(args) = pr_args {
        let backend = client.as_ref().map(|c| c as &dyn ChatBackend);
        return run_pr(&args, &repo, &settings, backend, &cancel).await;
    }

    let config = cli.workflow_config(&settings);
    let interaction = TerminalInteraction::new();
    let env = WorkflowEnv {
        repo: &repo,
        settings: &settings,
        classifier: &classifier,
        interaction: &interaction,
        backend: client.as_ref().map(|c| c as &dyn ChatBackend),
        cancel,
    };

    // Step 4: Run
    if cli.auto_group {
        return run_groups(&env, &config).await;
    }
    match Workflow::new(env, &config).run().await {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => Ok(report_error(&err)),
    }
}

async fn run_groups(
    env: &WorkflowEnv<'_, GitCommand>,
    config: &WorkflowConfig,
) -> Result<ExitCode> {
    let changes = env
        .repo
        .changed_files(false)
        .context("Failed to list changed files")?;
    let files = match &config.files {
        FileSpec::Unspecified => changes.paths(),
        spec => spec.resolve(&changes),
    };
    if files.is_empty() {
        return Ok(report_error(&WorkflowError::NothingToCommit(
            "the working tree has no changes".into(),
        )));
    }

    let groups = group_by_directory(&files);
    match run_batch(env, config, groups).await {
        Ok(report) => Ok(print_report(&report)),
        Err(err) => Ok(report_error(&err)),
    }
}

async fn run_pr(
    args: &PrArgs,
    repo: &GitRepo<GitCommand>,
    settings: &Settings,
    backend: Option<&dyn ChatBackend>,
    cancel: &CancellationToken,
) -> Result<ExitCode> {
    let head = match &args.source {
        Some(branch) => branch.clone(),
        None => repo
            .current_branch()
            .context("Cannot tell the current branch; pass --source")?,
    };
    let base = args
        .target
        .clone()
        .or_else(|| settings.git.default_branch.clone())
        .unwrap_or_else(|| FALLBACK_TARGET.to_string());

    match open_pull_request(args, repo, settings, backend, cancel, &base, &head).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => Ok(report_pr_error(&err)),
    }
}

async fn open_pull_request(
    args: &PrArgs,
    repo: &GitRepo<GitCommand>,
    settings: &Settings,
    backend: Option<&dyn ChatBackend>,
    cancel: &CancellationToken,
    base: &str,
    head: &str,
) -> Result<(), PrError> {
    // Step 1: What the branch adds
    let changes = BranchChanges::gather(repo, base, head)?;

    // Step 2: Title and description
    let PrDraft { title, body } = match backend {
        Some(backend) => {
            let mode = args.prompt_type.unwrap_or(settings.ai.prompt_mode);
            generate_draft(&changes, backend, &settings.ai, mode, cancel)
                .await
                .map_err(PrError::Generation)?
        }
        None => basic_draft(&changes),
    };

    if args.dry_run {
        println!("Dry run: would open a pull request from {head} into {base}\n");
        println!("# {title}\n\n{body}");
        return Ok(());
    }

    // Step 3: Open it on GitHub
    let token = get_github_token()?;
    let url = repo.remote_url(&settings.git.remote).map_err(PrError::Git)?;
    let (owner, name) = parse_github_remote(&url)?;
    let pull = NewPullRequest {
        title,
        body,
        head: head.to_string(),
        base: base.to_string(),
        draft: args.draft,
    };
    let created = create_pull_request(&token, &owner, &name, &pull).await?;

    println!("✓ Opened pull request #{}: {}", created.number, created.html_url);
    Ok(())
}

fn report_pr_error(err: &PrError) -> ExitCode {
    eprintln!("Error: {}", err);
    if let Some(hint) = err.suggestion() {
        eprintln!("  Hint: {}", hint);
    }

    if err.is_cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else {
        ExitCode::FAILURE
    }
}

fn print_outcome(outcome: &WorkflowOutcome) {
    if outcome.dry_run {
        println!(
            "\nDry run: would commit {} files to {} as:\n{}",
            outcome.files.len(),
            outcome.branch,
            outcome.message
        );
    } else {
        println!("✓ {}", first_line(&outcome.message));
    }
}

fn print_report(report: &BatchReport) -> ExitCode {
    println!();
    for group in &report.groups {
        match &group.result {
            Ok(outcome) => println!("✓ {}: {}", group.group.name, first_line(&outcome.message)),
            Err(err) => println!("✗ {}: {} [{}]", group.group.name, err, err.kind()),
        }
    }
    for group in &report.skipped {
        println!("- {}: skipped", group.name);
    }
    println!(
        "{} of {} groups committed",
        report.succeeded().count(),
        report.groups.len() + report.skipped.len()
    );

    if report.was_cancelled() {
        ExitCode::from(EXIT_CANCELLED)
    } else if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Print a workflow error with its category and any guidance.
fn report_error(err: &WorkflowError) -> ExitCode {
    eprintln!("Error [{}]: {}", err.kind(), err);
    if let Some(hint) = err.suggestion() {
        eprintln!("  Hint: {}", hint);
    }
    if let Some(commit) = err.commit() {
        eprintln!(
            "  Commit {} is safe locally. Push it with 'git push' when ready.",
            commit.get(..7).unwrap_or(commit)
        );
    }

    let cancelled = err.kind() == AbortKind::Cancelled
        || matches!(err, WorkflowError::PushCancelled { .. });
    if cancelled {
        ExitCode::from(EXIT_CANCELLED)
    } else {
        ExitCode::FAILURE
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
