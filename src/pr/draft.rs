//! Pull request title and body, written by AI or filled from git alone.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::AiSettings;
use crate::error::AiError;
use crate::llm::budget::{PromptMode, budget, cut_at_boundary};
use crate::llm::client::{ChatBackend, ChatMessage, ChatRequest};
use crate::pr::changes::BranchChanges;
use crate::pr::prompt::{PrInput, PrSection, section_prompt, simple_prompt};

/// Longest title kept from a model reply.
const MAX_TITLE_CHARS: usize = 100;

/// Diff bytes quoted in a description written without AI.
const BASIC_DIFF_EXCERPT: usize = 500;

/// A ready-to-submit pull request description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrDraft {
    pub title: String,
    pub body: String,
}

/// The prose parts of a description. Commits and files are filled in from
/// git when rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrSections {
    pub summary: String,
    pub code_changes: String,
    pub reason: String,
    pub test_plan: String,
    /// Left out of the body when blank.
    pub notes: String,
}

impl PrSections {
    pub fn render(&self, changes: &BranchChanges) -> String {
        let mut body = format!("## Summary\n\n{}\n\n", self.summary.trim());
        body.push_str(&facts(changes));
        body.push_str(&format!("## Code Changes\n\n{}\n\n", self.code_changes.trim()));
        body.push_str(&format!("## Reason for Changes\n\n{}\n\n", self.reason.trim()));
        body.push_str(&format!("## Test Plan\n\n{}\n", self.test_plan.trim()));
        if !self.notes.trim().is_empty() {
            body.push_str(&format!("\n## Additional Notes\n\n{}\n", self.notes.trim()));
        }
        body
    }
}

/// A description built from commit subjects and a diff excerpt, with
/// placeholders for the parts only a person can write.
pub fn basic_draft(changes: &BranchChanges) -> PrDraft {
    let excerpt = cut_at_boundary(&changes.diff, BASIC_DIFF_EXCERPT);
    let mut code_changes = format!("```diff\n{}\n```", excerpt.trim_end());
    if excerpt.len() < changes.diff.len() {
        code_changes.push_str("\n\n(diff excerpt)");
    }

    let sections = PrSections {
        summary: changes.commits.join("\n"),
        code_changes,
        reason: "Describe why these changes are needed.".to_string(),
        test_plan: "Describe how these changes were tested.".to_string(),
        notes: String::new(),
    };

    PrDraft {
        title: basic_title(changes),
        body: sections.render(changes),
    }
}

/// Have the backend write the description.
///
/// Advanced mode asks for each section separately; simple mode asks for the
/// whole description at once and takes the title from its first heading.
pub async fn generate_draft(
    changes: &BranchChanges,
    backend: &dyn ChatBackend,
    settings: &AiSettings,
    mode: PromptMode,
    cancel: &CancellationToken,
) -> Result<PrDraft, AiError> {
    if cancel.is_cancelled() {
        return Err(AiError::Cancelled);
    }

    let input = PrInput::new(changes, &budget(settings.context_window, mode));
    info!(
        "Generating pull request description with {} ({} prompt{})",
        settings.pr_model(),
        mode,
        if input.diff_truncated { ", diff truncated" } else { "" }
    );

    match mode {
        PromptMode::Simple => {
            let reply = ask(backend, settings, simple_prompt(&input), cancel).await?;
            Ok(split_markdown(&reply, changes))
        }
        PromptMode::Advanced => {
            let mut title = String::new();
            let mut sections = PrSections::default();
            for section in PrSection::ALL {
                debug!("Generating pull request {}", section.as_str());
                let prompt = section_prompt(section, &input);
                let reply = match ask(backend, settings, prompt, cancel).await {
                    Err(AiError::EmptyResponse) if section == PrSection::Notes => String::new(),
                    reply => reply?,
                };
                match section {
                    PrSection::Title => title = clean_title(&reply),
                    PrSection::Summary => sections.summary = reply,
                    PrSection::CodeChanges => sections.code_changes = reply,
                    PrSection::Reason => sections.reason = reply,
                    PrSection::TestPlan => sections.test_plan = reply,
                    PrSection::Notes if !is_none(&reply) => sections.notes = reply,
                    PrSection::Notes => {}
                }
            }

            if title.is_empty() {
                title = basic_title(changes);
            }
            Ok(PrDraft {
                title,
                body: sections.render(changes),
            })
        }
    }
}

async fn ask(
    backend: &dyn ChatBackend,
    settings: &AiSettings,
    messages: Vec<ChatMessage>,
    cancel: &CancellationToken,
) -> Result<String, AiError> {
    let request = ChatRequest {
        messages,
        model: settings.pr_model().to_string(),
        temperature: settings.temperature,
        timeout: settings.timeout,
        context_window: None,
    };
    backend.chat_completion(&request, cancel).await
}

/// Title from the first `# ` heading and the rest as the body, with the
/// commit and file lists added.
fn split_markdown(reply: &str, changes: &BranchChanges) -> PrDraft {
    let mut title = String::new();
    let mut rest = Vec::new();
    for line in reply.lines() {
        match line.strip_prefix("# ") {
            Some(heading) if title.is_empty() => title = clean_title(heading),
            _ => rest.push(line),
        }
    }
    if title.is_empty() {
        title = basic_title(changes);
    }

    let mut body = rest.join("\n").trim().to_string();
    body.push_str("\n\n");
    body.push_str(&facts(changes));
    PrDraft {
        title,
        body: body.trim_end().to_string() + "\n",
    }
}

/// First non-blank line with markdown and label noise removed.
fn clean_title(reply: &str) -> String {
    let line = reply.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or("");
    let line = line.trim_start_matches('#').trim();
    let line = ["Title:", "title:", "PR Title:"]
        .iter()
        .find_map(|label| line.strip_prefix(label))
        .unwrap_or(line);
    let line = line
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
        .trim()
        .trim_end_matches('.');

    line.chars().take(MAX_TITLE_CHARS).collect::<String>().trim().to_string()
}

/// A reply saying there is nothing to note.
fn is_none(reply: &str) -> bool {
    let reply = reply.trim().trim_end_matches('.');
    reply.is_empty() || reply.eq_ignore_ascii_case("none")
}

fn basic_title(changes: &BranchChanges) -> String {
    match changes.commits.first() {
        Some(subject) => format!("PR: {subject}"),
        None => "Pull Request".to_string(),
    }
}

/// Commit and file lists, straight from git.
fn facts(changes: &BranchChanges) -> String {
    let commits: String = changes.commits.iter().map(|c| format!("- {c}\n")).collect();
    let mut text = format!("## Commits\n\n{commits}\n## Files Changed\n\n");
    for (heading, paths) in [
        ("Added", changes.added()),
        ("Modified", changes.modified()),
        ("Deleted", changes.deleted()),
    ] {
        text.push_str(&format!("### {heading}\n\n"));
        if paths.is_empty() {
            text.push_str("None\n\n");
        } else {
            for path in paths {
                text.push_str(&format!("- `{path}`\n"));
            }
            text.push('\n');
        }
    }
    text
}
