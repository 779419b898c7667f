//! Token budgeting for commit message prompts.
//!
//! Token counts are estimated at a fixed characters-per-token ratio over
//! UTF-8 bytes, which overestimates for non-ASCII text. The goal is to stay
//! clear of backend-side truncation, not to tokenize exactly.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use crate::config::DEFAULT_MIN_DIFF_TOKENS;
use crate::llm::context::{CommitContext, Section};

pub const CHARS_PER_TOKEN: usize = 4;

/// Share of the context window available for input in each mode.
const SIMPLE_INPUT_RATIO: f64 = 0.65;
const ADVANCED_INPUT_RATIO: f64 = 0.80;

/// Lowest priority first. The diff is always last.
pub const DROP_ORDER: [Section; 4] = [
    Section::RelatedCommits,
    Section::RecentCommits,
    Section::Patterns,
    Section::Diff,
];

/// Prompt complexity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptMode {
    Simple,
    #[default]
    Advanced,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Simple => "simple",
            PromptMode::Advanced => "advanced",
        }
    }

    pub fn input_ratio(&self) -> f64 {
        match self {
            PromptMode::Simple => SIMPLE_INPUT_RATIO,
            PromptMode::Advanced => ADVANCED_INPUT_RATIO,
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simple" => Ok(PromptMode::Simple),
            "advanced" => Ok(PromptMode::Advanced),
            _ => Err(format!("Unknown prompt type: {}. Expected simple or advanced", s)),
        }
    }
}

/// Input/output split of a context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBudget {
    pub input_tokens: usize,
    pub output_tokens: usize,
    /// The diff keeps at least this many tokens while any other section has content.
    pub min_diff_tokens: usize,
    pub drop_order: Vec<Section>,
}

impl PromptBudget {
    pub fn with_min_diff_tokens(mut self, tokens: usize) -> Self {
        self.min_diff_tokens = tokens.min(self.input_tokens);
        self
    }

    /// The same budget with `tokens` of input set aside for fixed prompt text.
    pub fn reserve(&self, tokens: usize) -> Self {
        let input_tokens = self.input_tokens.saturating_sub(tokens);
        Self {
            input_tokens,
            output_tokens: self.output_tokens,
            min_diff_tokens: self.min_diff_tokens.min(input_tokens),
            drop_order: self.drop_order.clone(),
        }
    }
}

/// Split `context_window` tokens between prompt input and response.
pub fn budget(context_window: usize, mode: PromptMode) -> PromptBudget {
    let input_tokens = (context_window as f64 * mode.input_ratio()).floor() as usize;
    PromptBudget {
        input_tokens,
        output_tokens: context_window.saturating_sub(input_tokens),
        min_diff_tokens: DEFAULT_MIN_DIFF_TOKENS.min(input_tokens),
        drop_order: DROP_ORDER.to_vec(),
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Shrink `context` until its rendered sections fit `budget.input_tokens`.
///
/// Sections are cut in `budget.drop_order`, one entry at a time. The diff
/// is cut from the end and keeps `min_diff_tokens` while anything else
/// remains.
pub fn truncate(mut context: CommitContext, budget: &PromptBudget) -> CommitContext {
    let limit = budget.input_tokens;
    let before = context.tokens();
    if before <= limit {
        return context;
    }

    for section in &budget.drop_order {
        if context.tokens() <= limit {
            break;
        }
        match section {
            Section::Diff => truncate_diff(&mut context, limit, budget.min_diff_tokens),
            other => while context.tokens() > limit && context.shrink(*other) {},
        }
    }

    // Only reachable when the diff was ordered ahead of other sections.
    if context.tokens() > limit {
        for section in [Section::RelatedCommits, Section::RecentCommits, Section::Patterns] {
            while context.tokens() > limit && context.shrink(section) {}
        }
        truncate_diff(&mut context, limit, 0);
    }

    debug!(
        "Truncated prompt context from {} to {} tokens (limit {})",
        before,
        context.tokens(),
        limit
    );
    context
}

fn truncate_diff(context: &mut CommitContext, limit: usize, floor: usize) {
    let diff_tokens = context.section_tokens(Section::Diff);
    let others = context.tokens() - diff_tokens;
    let mut target = limit.saturating_sub(others);
    if context.has_content_besides_diff() {
        target = target.max(floor);
    }
    if diff_tokens <= target {
        return;
    }

    let wrapper = CommitContext::diff_wrapper_len();
    let allowed = (target * CHARS_PER_TOKEN).saturating_sub(wrapper);
    context.diff = cut_at_boundary(&context.diff, allowed).to_string();
    context.diff_truncated = true;
}

/// Longest prefix of `text` no longer than `max_bytes`, on a char boundary.
pub(crate) fn cut_at_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
