//! Workflow states, in the order a successful run passes through them.

use std::fmt;

/// A point in the add-commit-push run. The derived ordering follows the
/// happy path; `Aborted` sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WorkflowState {
    Start,
    FilesSelected,
    BranchResolved,
    Staged,
    MessageReady,
    TypeResolved,
    Confirmed,
    Committed,
    Pushed,
    Done,
    Aborted,
}

impl WorkflowState {
    /// The state after this one on a successful run.
    pub fn next(self) -> Option<Self> {
        use WorkflowState::*;
        match self {
            Start => Some(FilesSelected),
            FilesSelected => Some(BranchResolved),
            BranchResolved => Some(Staged),
            Staged => Some(MessageReady),
            MessageReady => Some(TypeResolved),
            TypeResolved => Some(Confirmed),
            Confirmed => Some(Committed),
            Committed => Some(Pushed),
            Pushed => Some(Done),
            Done | Aborted => None,
        }
    }

    /// Whether a local commit exists once this state is reached.
    pub fn has_committed(self) -> bool {
        self >= WorkflowState::Committed && self != WorkflowState::Aborted
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "start",
            WorkflowState::FilesSelected => "files-selected",
            WorkflowState::BranchResolved => "branch-resolved",
            WorkflowState::Staged => "staged",
            WorkflowState::MessageReady => "message-ready",
            WorkflowState::TypeResolved => "type-resolved",
            WorkflowState::Confirmed => "confirmed",
            WorkflowState::Committed => "committed",
            WorkflowState::Pushed => "pushed",
            WorkflowState::Done => "done",
            WorkflowState::Aborted => "aborted",
        }
    }

    /// The action that leads into this state, for error messages.
    pub fn step_name(&self) -> &'static str {
        match self {
            WorkflowState::Start => "check the staging area",
            WorkflowState::FilesSelected => "select files",
            WorkflowState::BranchResolved => "resolve the branch",
            WorkflowState::Staged => "stage files",
            WorkflowState::MessageReady => "prepare the commit message",
            WorkflowState::TypeResolved => "resolve the commit type",
            WorkflowState::Confirmed => "confirm",
            WorkflowState::Committed => "commit",
            WorkflowState::Pushed => "push",
            WorkflowState::Done => "finish",
            WorkflowState::Aborted => "clean up",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_is_ordered() {
        let mut state = WorkflowState::Start;
        let mut visited = vec![state];
        while let Some(next) = state.next() {
            assert!(next > state);
            state = next;
            visited.push(state);
        }
        assert_eq!(state, WorkflowState::Done);
        assert_eq!(visited.len(), 10);
        assert!(!visited.contains(&WorkflowState::Aborted));
    }

    #[test]
    fn test_has_committed() {
        assert!(!WorkflowState::Confirmed.has_committed());
        assert!(WorkflowState::Committed.has_committed());
        assert!(WorkflowState::Done.has_committed());
        assert!(!WorkflowState::Aborted.has_committed());
    }
}
