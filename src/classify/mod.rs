//! Commit type classification.
//!
//! Five tiers, first match wins:
//! 1. a conventional prefix on the message (`fix: ...`)
//! 2. a strict majority of changed paths voting for one type
//! 3. keywords in the message
//! 4. keywords in the diff (staged, falling back to unstaged)
//! 5. `chore`

pub mod conventional;
pub mod rules;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::debug;

pub use conventional::{Header, parse_header, parse_prefix};
pub use rules::ClassifierRules;

use crate::error::{ClassificationError, CommandError, PatternError};
use crate::git::{CommandRunner, DiffKind, GitRepo};

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Test,
    Chore,
    Revert,
}

impl CommitType {
    pub const ALL: [CommitType; 8] = [
        CommitType::Feat,
        CommitType::Fix,
        CommitType::Docs,
        CommitType::Style,
        CommitType::Refactor,
        CommitType::Test,
        CommitType::Chore,
        CommitType::Revert,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitType::Feat => "feat",
            CommitType::Fix => "fix",
            CommitType::Docs => "docs",
            CommitType::Style => "style",
            CommitType::Refactor => "refactor",
            CommitType::Test => "test",
            CommitType::Chore => "chore",
            CommitType::Revert => "revert",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            CommitType::Feat => "✨",
            CommitType::Fix => "🐛",
            CommitType::Docs => "📝",
            CommitType::Style => "💎",
            CommitType::Refactor => "♻️",
            CommitType::Test => "🧪",
            CommitType::Chore => "📦",
            CommitType::Revert => "⏪",
        }
    }

    /// Display label used as the commit message prefix, e.g. `feat ✨`.
    pub fn label(&self) -> String {
        format!("{} {}", self.as_str(), self.emoji())
    }

    pub fn description(&self) -> &'static str {
        match self {
            CommitType::Feat => "A new feature",
            CommitType::Fix => "A bug fix",
            CommitType::Docs => "Documentation only changes",
            CommitType::Style => "Formatting, whitespace, linting",
            CommitType::Refactor => "Code change that neither fixes a bug nor adds a feature",
            CommitType::Test => "Adding or correcting tests",
            CommitType::Chore => "Build, tooling, dependencies, CI",
            CommitType::Revert => "Reverts a previous commit",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitType {
    type Err = String;

    /// Accepts the bare type or its label (`feat`, `FEAT`, `feat ✨`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let word = s.split_whitespace().next().unwrap_or("");
        match word.to_lowercase().as_str() {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "test" => Ok(Self::Test),
            "chore" => Ok(Self::Chore),
            "revert" => Ok(Self::Revert),
            _ => Err(format!(
                "Unknown commit type: {}. Expected one of: feat, fix, docs, style, refactor, test, chore, revert",
                s
            )),
        }
    }
}

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    MessagePrefix,
    PathMajority,
    MessageKeyword,
    DiffKeyword,
    Default,
}

/// A classified commit type and the tier that decided it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub commit_type: CommitType,
    pub tier: Tier,
}

impl Classification {
    fn new(commit_type: CommitType, tier: Tier) -> Self {
        Self { commit_type, tier }
    }
}

/// Stateless classifier over a set of rule tables.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: ClassifierRules,
}

impl Classifier {
    pub fn new(rules: ClassifierRules) -> Self {
        Self { rules }
    }

    pub fn with_defaults() -> Result<Self, PatternError> {
        Ok(Self::new(ClassifierRules::defaults()?))
    }

    /// Classify using `diff` to fetch diff text, called only when tiers 1 to 3
    /// have not decided.
    pub fn classify_with<F>(
        &self,
        message: Option<&str>,
        files: &[String],
        diff: F,
    ) -> Result<Classification, ClassificationError>
    where
        F: FnOnce() -> Result<String, CommandError>,
    {
        let message = message.map(str::trim).filter(|m| !m.is_empty());

        if let Some(ty) = message.and_then(parse_prefix) {
            return Ok(Classification::new(ty, Tier::MessagePrefix));
        }

        if let Some(ty) = self.path_majority(files) {
            return Ok(Classification::new(ty, Tier::PathMajority));
        }

        if let Some(ty) = message.and_then(|m| self.rules.keyword_type(m)) {
            return Ok(Classification::new(ty, Tier::MessageKeyword));
        }

        let diff_text = diff().map_err(ClassificationError::Diff)?;
        if let Some(ty) = self.rules.keyword_type(&diff_text) {
            return Ok(Classification::new(ty, Tier::DiffKeyword));
        }

        Ok(Classification::new(CommitType::Chore, Tier::Default))
    }

    /// Classify against a repository, reading the staged diff and falling
    /// back to the unstaged one when nothing is staged.
    pub fn classify<R: CommandRunner>(
        &self,
        message: Option<&str>,
        files: &[String],
        repo: &GitRepo<R>,
    ) -> Result<Classification, ClassificationError> {
        let result = self.classify_with(message, files, || {
            let staged = repo.diff(DiffKind::Staged)?;
            if staged.is_empty() {
                repo.diff(DiffKind::Unstaged)
            } else {
                Ok(staged)
            }
        })?;
        debug!(
            "Classified as {} via {:?} ({} files)",
            result.commit_type,
            result.tier,
            files.len()
        );
        Ok(result)
    }

    /// The type voted for by more than half of `files`, if any.
    pub fn path_majority(&self, files: &[String]) -> Option<CommitType> {
        if files.is_empty() {
            return None;
        }

        let mut votes: HashMap<CommitType, usize> = HashMap::new();
        for file in files {
            if let Some(ty) = self.rules.path_type(file) {
                *votes.entry(ty).or_default() += 1;
            }
        }

        votes
            .into_iter()
            .find(|(_, count)| count * 2 > files.len())
            .map(|(ty, _)| ty)
    }
}
