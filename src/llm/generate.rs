//! Commit message generation: gather context, budget it, ask the backend.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{AiError, GenerationError};
use crate::git::{CommandRunner, GitRepo};
use crate::llm::budget::{PromptMode, budget};
use crate::llm::client::{ChatBackend, ChatRequest};
use crate::llm::context::CommitContext;
use crate::llm::prompt::{Prompt, build_prompt};

/// Per-run AI overrides from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AiOverrides {
    pub model: Option<String>,
    pub context_window: Option<usize>,
    /// Replaces the generated prompt entirely.
    pub custom_prompt: Option<String>,
}

/// Build the prompt for the staged changes. A custom prompt skips context
/// gathering altogether.
pub fn prepare_prompt<R: CommandRunner>(
    repo: &GitRepo<R>,
    settings: &Settings,
    mode: PromptMode,
    overrides: &AiOverrides,
) -> Result<Prompt, GenerationError> {
    if let Some(custom) = overrides.custom_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        debug!("Using custom prompt ({} chars)", custom.len());
        return Ok(Prompt::custom(custom));
    }

    let window = overrides.context_window.unwrap_or(settings.ai.context_window);
    let budget = budget(window, mode).with_min_diff_tokens(settings.ai.min_diff_tokens);
    let context = CommitContext::gather(repo, &settings.git, mode).map_err(GenerationError::Context)?;
    let prompt = build_prompt(context, mode, &budget)?;

    debug!(
        "Built {} prompt: ~{} of {} input tokens{}",
        prompt.mode,
        prompt.estimated_tokens(),
        budget.input_tokens,
        if prompt.diff_truncated { ", diff truncated" } else { "" }
    );
    Ok(prompt)
}

/// Generate a commit message for the staged changes.
pub async fn generate_commit_message<R: CommandRunner>(
    repo: &GitRepo<R>,
    backend: &dyn ChatBackend,
    settings: &Settings,
    mode: PromptMode,
    overrides: &AiOverrides,
    cancel: &CancellationToken,
) -> Result<String, GenerationError> {
    if cancel.is_cancelled() {
        return Err(AiError::Cancelled.into());
    }

    let prompt = prepare_prompt(repo, settings, mode, overrides)?;
    let request = ChatRequest {
        messages: prompt.messages,
        model: overrides
            .model
            .clone()
            .unwrap_or_else(|| settings.ai.model.clone()),
        temperature: settings.ai.temperature,
        timeout: settings.ai.timeout,
        context_window: overrides.context_window,
    };

    info!("Generating commit message with {}", request.model);
    let message = backend.chat_completion(&request, cancel).await?;
    Ok(message)
}
