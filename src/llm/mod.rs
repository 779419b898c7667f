//! AI commit message generation: context budgeting, prompts, and the
//! chat-completion client.

pub mod budget;
pub mod client;
pub mod context;
pub mod generate;
pub mod prompt;

pub use budget::{CHARS_PER_TOKEN, PromptBudget, PromptMode, budget, estimate_tokens, truncate};
pub use client::{AiClient, ChatBackend, ChatMessage, ChatRequest, Endpoint, Role, clean_response};
pub use context::{CommitContext, Section};
pub use generate::{AiOverrides, generate_commit_message, prepare_prompt};
pub use prompt::{Prompt, build_prompt, sanitize_diff};
