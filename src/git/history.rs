//! Commit history: recent commits, commits related to a diff, and the
//! type/scope habits of the repository.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use tracing::debug;

use crate::classify::parse_header;
use crate::error::{CommandCategory, CommandError};
use crate::git::GitRepo;
use crate::git::diff::touched_files;
use crate::git::runner::CommandRunner;

const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// How many commits to scan per related commit requested.
const RELATED_SCAN_FACTOR: usize = 10;

/// A commit summarized for prompt context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitSummary {
    pub hash: String,
    pub date: NaiveDate,
    pub subject: String,
}

impl CommitSummary {
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.trim().splitn(3, FIELD_SEP);
        let hash = fields.next()?.trim();
        let date = fields.next()?.trim();
        let subject = fields.next().unwrap_or("").trim();
        if hash.is_empty() {
            return None;
        }
        let date = match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                debug!("Skipping commit {} with unparseable date '{}': {}", hash, date, e);
                return None;
            }
        };
        Some(Self {
            hash: hash.to_string(),
            date,
            subject: subject.to_string(),
        })
    }
}

/// Frequency tables of commit types and scopes, most frequent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitPatterns {
    pub types: Vec<(String, usize)>,
    pub scopes: Vec<(String, usize)>,
}

impl CommitPatterns {
    pub fn is_empty(&self) -> bool {
        self.types.is_empty() && self.scopes.is_empty()
    }

    pub fn most_common_type(&self) -> Option<&str> {
        self.types.first().map(|(t, _)| t.as_str())
    }

    /// Drop the least frequent entry, scopes before types.
    pub fn pop_least_frequent(&mut self) -> bool {
        self.scopes.pop().is_some() || self.types.pop().is_some()
    }
}

/// Count conventional types and scopes across commit subjects.
pub fn analyze_patterns(commits: &[CommitSummary]) -> CommitPatterns {
    let mut types: HashMap<String, usize> = HashMap::new();
    let mut scopes: HashMap<String, usize> = HashMap::new();

    for commit in commits {
        if let Some(header) = parse_header(&commit.subject) {
            *types.entry(header.kind).or_default() += 1;
            if let Some(scope) = header.scope {
                *scopes.entry(scope).or_default() += 1;
            }
        }
    }

    CommitPatterns {
        types: sorted_counts(types),
        scopes: sorted_counts(scopes),
    }
}

fn sorted_counts(counts: HashMap<String, usize>) -> Vec<(String, usize)> {
    let mut sorted: Vec<(String, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

impl<R: CommandRunner> GitRepo<R> {
    /// Up to `limit` commits, newest first. An empty repository yields none.
    pub fn recent_commits(&self, limit: usize) -> Result<Vec<CommitSummary>, CommandError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let count = format!("-n{limit}");
        let out = match self.git(&[
            "log",
            &count,
            "--date=short",
            "--pretty=format:%H%x1f%ad%x1f%s",
        ]) {
            Ok(out) => out,
            Err(e) if e.category() == CommandCategory::EmptyHistory => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(out.lines().filter_map(CommitSummary::parse).collect())
    }

    /// Subjects of the commits on `head` that are not on `base`, newest first.
    pub fn commit_subjects_between(
        &self,
        base: &str,
        head: &str,
    ) -> Result<Vec<String>, CommandError> {
        let range = format!("{base}..{head}");
        let out = self.git(&["log", "--no-merges", "--pretty=format:%s", &range])?;
        Ok(out
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    /// Up to `limit` recent commits whose changed files overlap the files
    /// touched by `diff_text`, newest first.
    pub fn related_commits(
        &self,
        diff_text: &str,
        limit: usize,
    ) -> Result<Vec<CommitSummary>, CommandError> {
        let touched = touched_files(diff_text);
        if limit == 0 || touched.is_empty() {
            return Ok(Vec::new());
        }

        let count = format!("-n{}", limit.saturating_mul(RELATED_SCAN_FACTOR));
        let out = match self.git(&[
            "log",
            &count,
            "--date=short",
            "--name-only",
            "--pretty=format:%x1e%H%x1f%ad%x1f%s",
        ]) {
            Ok(out) => out,
            Err(e) if e.category() == CommandCategory::EmptyHistory => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let related: Vec<CommitSummary> = out
            .split(RECORD_SEP)
            .filter_map(|record| {
                let mut lines = record.lines().filter(|l| !l.trim().is_empty());
                let summary = CommitSummary::parse(lines.next()?)?;
                let files: BTreeSet<&str> = lines.map(str::trim).collect();
                files
                    .iter()
                    .any(|f| touched.contains(*f))
                    .then_some(summary)
            })
            .take(limit)
            .collect();

        debug!(
            "Found {} related commits for {} touched files",
            related.len(),
            touched.len()
        );
        Ok(related)
    }
}
