//! Repository context gathered for a single AI request.

use std::fmt::Write as _;

use crate::config::GitSettings;
use crate::error::CommandError;
use crate::git::{CommandRunner, CommitPatterns, CommitSummary, DiffKind, GitRepo, analyze_patterns};
use crate::llm::budget::{PromptMode, estimate_tokens};
use crate::llm::prompt::sanitize_diff;

/// Commits sampled when learning the repository's type/scope habits.
const PATTERN_SAMPLE_SIZE: usize = 50;

const DIFF_HEADING: &str = "## Changes\n```diff\n";
const DIFF_FOOTER: &str = "\n```\n\n";
const DIFF_TRUNCATED_NOTE: &str = "(diff truncated to fit the context window)\n\n";

/// A prompt section that can be measured and shrunk independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    RelatedCommits,
    RecentCommits,
    Patterns,
    Diff,
}

/// Everything the prompt may include about the change and its history.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitContext {
    pub diff: String,
    pub diff_truncated: bool,
    /// Newest first.
    pub recent_commits: Vec<CommitSummary>,
    /// Newest first.
    pub related_commits: Vec<CommitSummary>,
    pub patterns: CommitPatterns,
}

impl CommitContext {
    /// Read the diff (staged, or unstaged when nothing is staged) and, in
    /// advanced mode, the history sections.
    pub fn gather<R: CommandRunner>(
        repo: &GitRepo<R>,
        settings: &GitSettings,
        mode: PromptMode,
    ) -> Result<Self, CommandError> {
        let mut diff = repo.diff(DiffKind::Staged)?;
        if diff.is_empty() {
            diff = repo.diff(DiffKind::Unstaged)?;
        }

        let mut context = CommitContext {
            diff: sanitize_diff(&diff),
            ..Default::default()
        };
        if mode == PromptMode::Simple {
            return Ok(context);
        }

        let sample = repo.recent_commits(PATTERN_SAMPLE_SIZE.max(settings.recent_commits))?;
        context.patterns = analyze_patterns(&sample);
        context.recent_commits = sample.into_iter().take(settings.recent_commits).collect();
        context.related_commits = repo.related_commits(&diff, settings.related_commits)?;
        Ok(context)
    }

    /// Drop history sections that `mode` does not render.
    pub fn for_mode(mut self, mode: PromptMode) -> Self {
        if mode == PromptMode::Simple {
            self.recent_commits.clear();
            self.related_commits.clear();
            self.patterns = CommitPatterns::default();
        }
        self
    }

    /// Rendered text of a section, empty when the section has no content.
    pub fn render(&self, section: Section) -> String {
        match section {
            Section::Diff => self.render_diff(),
            Section::RecentCommits => render_commits("## Recent Commits", &self.recent_commits),
            Section::RelatedCommits => {
                render_commits("## Related Commits (touching the same files)", &self.related_commits)
            }
            Section::Patterns => self.render_patterns(),
        }
    }

    pub fn section_tokens(&self, section: Section) -> usize {
        estimate_tokens(&self.render(section))
    }

    /// Token estimate across all sections.
    pub fn tokens(&self) -> usize {
        [
            Section::Diff,
            Section::RecentCommits,
            Section::RelatedCommits,
            Section::Patterns,
        ]
        .into_iter()
        .map(|s| self.section_tokens(s))
        .sum()
    }

    pub fn has_content_besides_diff(&self) -> bool {
        !self.recent_commits.is_empty()
            || !self.related_commits.is_empty()
            || !self.patterns.is_empty()
    }

    /// Remove the lowest-priority entry from `section`. Returns false when
    /// there was nothing left to remove. The diff is never shrunk here.
    pub fn shrink(&mut self, section: Section) -> bool {
        match section {
            Section::RelatedCommits => self.related_commits.pop().is_some(),
            Section::RecentCommits => self.recent_commits.pop().is_some(),
            Section::Patterns => self.patterns.pop_least_frequent(),
            Section::Diff => false,
        }
    }

    /// Bytes the diff section adds around the diff text itself, assuming
    /// the truncation note is present.
    pub fn diff_wrapper_len() -> usize {
        DIFF_HEADING.len() + DIFF_FOOTER.len() + DIFF_TRUNCATED_NOTE.len()
    }

    fn render_diff(&self) -> String {
        if self.diff.is_empty() {
            return String::new();
        }
        let mut out = String::with_capacity(self.diff.len() + Self::diff_wrapper_len());
        out.push_str(DIFF_HEADING);
        out.push_str(&self.diff);
        out.push_str(DIFF_FOOTER);
        if self.diff_truncated {
            out.push_str(DIFF_TRUNCATED_NOTE);
        }
        out
    }

    fn render_patterns(&self) -> String {
        if self.patterns.is_empty() {
            return String::new();
        }
        let mut out = String::from("## Style Guide\n");
        if let Some(most_used) = self.patterns.most_common_type() {
            let _ = writeln!(out, "Most used commit type: {most_used}");
        }
        if !self.patterns.types.is_empty() {
            let _ = writeln!(out, "Type frequency: {}", format_counts(&self.patterns.types));
        }
        if !self.patterns.scopes.is_empty() {
            let _ = writeln!(out, "Common scopes: {}", format_counts(&self.patterns.scopes));
        }
        out.push('\n');
        out
    }
}

fn render_commits(heading: &str, commits: &[CommitSummary]) -> String {
    if commits.is_empty() {
        return String::new();
    }
    let mut out = format!("{heading}\n");
    for c in commits {
        let _ = writeln!(out, "- {} {} {}", c.date, c.short_hash(), c.subject);
    }
    out.push('\n');
    out
}

fn format_counts(counts: &[(String, usize)]) -> String {
    counts
        .iter()
        .map(|(name, n)| format!("{name} ({n})"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testing::FakeRunner;
    use crate::pattern::PathMatcher;
    use chrono::NaiveDate;

    const DIFF: &str = "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n+fn x() {}\n";

    fn log_line(hash: &str, subject: &str) -> String {
        format!("{hash}\x1f2024-03-01\x1f{subject}")
    }

    #[test]
    fn test_gather_simple_skips_history() {
        let repo = GitRepo::new(FakeRunner::new().on("diff --cached", DIFF), PathMatcher::empty());
        let ctx = CommitContext::gather(&repo, &GitSettings::default(), PromptMode::Simple).unwrap();
        assert_eq!(ctx.diff, DIFF);
        assert!(!ctx.has_content_besides_diff());
        assert!(!repo.runner().called("log"));
    }

    #[test]
    fn test_gather_advanced_reads_history() {
        let log = [
            log_line("a1", "feat(api): one"),
            log_line("a2", "fix(api): two"),
            log_line("a3", "feat: three"),
            log_line("a4", "feat: four"),
        ]
        .join("\n");
        let related = "\x1ea2\x1f2024-03-01\x1ffix(api): two\n\nsrc/lib.rs\n";
        let runner = FakeRunner::new()
            .on("diff --cached", DIFF)
            .on("log -n50", &log)
            .on("log -n30", related);
        let repo = GitRepo::new(runner, PathMatcher::empty());

        let ctx = CommitContext::gather(&repo, &GitSettings::default(), PromptMode::Advanced).unwrap();
        assert_eq!(ctx.recent_commits.len(), 3);
        assert_eq!(ctx.recent_commits[0].hash, "a1");
        assert_eq!(ctx.related_commits.len(), 1);
        assert_eq!(ctx.patterns.most_common_type(), Some("feat"));
    }

    #[test]
    fn test_gather_falls_back_to_unstaged() {
        let runner = FakeRunner::new()
            .on("diff --cached", "")
            .on("diff --no-color", DIFF);
        let repo = GitRepo::new(runner, PathMatcher::empty());
        let ctx = CommitContext::gather(&repo, &GitSettings::default(), PromptMode::Simple).unwrap();
        assert_eq!(ctx.diff, DIFF);
    }

    #[test]
    fn test_empty_sections_render_nothing() {
        let ctx = CommitContext::default();
        assert_eq!(ctx.tokens(), 0);
        assert_eq!(ctx.render(Section::Diff), "");
        assert_eq!(ctx.render(Section::Patterns), "");
    }

    #[test]
    fn test_diff_wrapper_len_matches_rendering() {
        let ctx = CommitContext {
            diff: "+x\n".into(),
            diff_truncated: true,
            ..Default::default()
        };
        assert_eq!(
            ctx.render(Section::Diff).len(),
            CommitContext::diff_wrapper_len() + 3
        );
    }

    #[test]
    fn test_render_commits_lines() {
        let ctx = CommitContext {
            recent_commits: vec![CommitSummary {
                hash: "0123456789abcdef".into(),
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                subject: "feat: add x".into(),
            }],
            ..Default::default()
        };
        assert_eq!(
            ctx.render(Section::RecentCommits),
            "## Recent Commits\n- 2024-03-01 0123456 feat: add x\n\n"
        );
    }

    #[test]
    fn test_for_simple_mode_clears_history() {
        let ctx = CommitContext {
            diff: "+x".into(),
            patterns: CommitPatterns {
                types: vec![("feat".into(), 1)],
                scopes: vec![],
            },
            ..Default::default()
        }
        .for_mode(PromptMode::Simple);
        assert!(!ctx.has_content_besides_diff());
        assert_eq!(ctx.diff, "+x");
    }
}
