//! Batch mode: one workflow run per group of files.
//!
//! Groups run one after another because they share the repository index.
//! Before each group the index must be empty; a group that leaves staged
//! files behind stops the batch rather than leaking them into the next
//! commit.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::error::{AbortKind, WorkflowError};
use crate::git::CommandRunner;
use crate::workflow::config::WorkflowConfig;
use crate::workflow::orchestrator::{Workflow, WorkflowEnv, WorkflowOutcome};
use crate::workflow::state::WorkflowState;

/// Group name for files at the repository root.
pub const ROOT_GROUP: &str = "(root)";

/// Files committed together in one batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileGroup {
    pub name: String,
    pub files: Vec<String>,
}

/// Group `files` by their top-level directory, in name order. Files at the
/// root share one group.
pub fn group_by_directory(files: &[String]) -> Vec<FileGroup> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for file in files {
        let name = match file.split_once('/') {
            Some((dir, _)) => dir.to_string(),
            None => ROOT_GROUP.to_string(),
        };
        groups.entry(name).or_default().push(file.clone());
    }
    groups
        .into_iter()
        .map(|(name, files)| FileGroup { name, files })
        .collect()
}

/// Result of one group.
#[derive(Debug)]
pub struct GroupReport {
    pub group: FileGroup,
    pub result: Result<WorkflowOutcome, WorkflowError>,
}

/// Per-group results, in execution order. Groups after a stop are absent.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub groups: Vec<GroupReport>,
    /// Groups that were never started.
    pub skipped: Vec<FileGroup>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &GroupReport> {
        self.groups.iter().filter(|g| g.result.is_ok())
    }

    pub fn is_success(&self) -> bool {
        self.skipped.is_empty() && self.groups.iter().all(|g| g.result.is_ok())
    }

    pub fn was_cancelled(&self) -> bool {
        self.groups.iter().any(|g| {
            matches!(&g.result, Err(e) if e.kind() == AbortKind::Cancelled)
                || matches!(&g.result, Err(WorkflowError::PushCancelled { .. }))
        })
    }
}

/// Run every group through its own workflow, each with a copy of `base`
/// restricted to the group's files.
///
/// Fails up front when the index already holds staged files. Afterwards,
/// failures are recorded per group and the batch goes on, except for
/// cancellation and a dirty index, which stop it.
pub async fn run_batch<R: CommandRunner>(
    env: &WorkflowEnv<'_, R>,
    base: &WorkflowConfig,
    groups: Vec<FileGroup>,
) -> Result<BatchReport, WorkflowError> {
    let staged = env
        .repo
        .staged_paths()
        .map_err(|source| WorkflowError::Command {
            state: WorkflowState::Start,
            source,
        })?;
    if !staged.is_empty() {
        return Err(WorkflowError::StagingNotEmpty(staged));
    }

    info!("Running {} groups", groups.len());
    let mut report = BatchReport::default();
    let mut pending = groups.into_iter();

    while let Some(group) = pending.next() {
        if env.cancel.is_cancelled() {
            report.skipped.push(group);
            break;
        }
        if let Err(err) = ensure_index_empty(env) {
            warn!("Stopping batch before group {}: {}", group.name, err);
            report.groups.push(GroupReport { group, result: Err(err) });
            break;
        }

        env.interaction.notify(&format!(
            "Group {} ({} files)",
            group.name,
            group.files.len()
        ));
        let config = base.for_files(group.files.clone());
        let result = Workflow::new(env.clone(), &config).run().await;

        let stop = matches!(
            &result,
            Err(WorkflowError::Cancelled) | Err(WorkflowError::PushCancelled { .. })
        );
        if let Err(err) = &result {
            debug!("Group {} failed: {}", group.name, err);
        }
        report.groups.push(GroupReport { group, result });
        if stop {
            break;
        }
    }

    report.skipped.extend(pending);
    Ok(report)
}

fn ensure_index_empty<R: CommandRunner>(env: &WorkflowEnv<'_, R>) -> Result<(), WorkflowError> {
    let staged = env
        .repo
        .staged_paths()
        .map_err(|source| WorkflowError::Command {
            state: WorkflowState::Start,
            source,
        })?;
    if staged.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::StagingNotEmpty(staged))
    }
}
