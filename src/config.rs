//! Settings read from the environment once per run.
//!
//! The binary loads `~/.config/git-acp/.env` into the process environment
//! before calling [`Settings::from_env`]; variables already set in the
//! environment take precedence over the file.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::llm::PromptMode;

pub const DEFAULT_MODEL: &str = "mevatron/diffsense:1.5b";
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_API_KEY: &str = "ollama";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_CONTEXT_WINDOW: usize = 8192;
pub const DEFAULT_MIN_DIFF_TOKENS: usize = 512;
pub const DEFAULT_RECENT_COMMITS: usize = 3;
pub const DEFAULT_RELATED_COMMITS: usize = 3;

pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 120;
pub const MIN_AI_TIMEOUT_SECS: u64 = 10;
pub const MAX_AI_TIMEOUT_SECS: u64 = 300;

/// Noise that never belongs in a commit: caches, virtualenvs, secrets, VCS metadata.
pub const DEFAULT_EXCLUDED_PATTERNS: &[&str] = &[
    "__pycache__",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    ".env",
    ".venv",
    "node_modules",
    ".git",
];

/// Settings for the AI backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AiSettings {
    pub model: String,
    /// Model for pull request descriptions; falls back to `model`.
    pub pr_model: Option<String>,
    pub temperature: f32,
    pub base_url: String,
    pub fallback_base_url: Option<String>,
    pub api_key: String,
    pub timeout: Duration,
    pub prompt_mode: PromptMode,
    pub context_window: usize,
    pub min_diff_tokens: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            pr_model: None,
            temperature: DEFAULT_TEMPERATURE,
            base_url: DEFAULT_BASE_URL.to_string(),
            fallback_base_url: None,
            api_key: DEFAULT_API_KEY.to_string(),
            timeout: Duration::from_secs(DEFAULT_AI_TIMEOUT_SECS),
            prompt_mode: PromptMode::Advanced,
            context_window: DEFAULT_CONTEXT_WINDOW,
            min_diff_tokens: DEFAULT_MIN_DIFF_TOKENS,
        }
    }
}

impl AiSettings {
    pub fn pr_model(&self) -> &str {
        self.pr_model.as_deref().unwrap_or(&self.model)
    }
}

/// Settings for git and history analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct GitSettings {
    pub default_branch: Option<String>,
    pub remote: String,
    pub recent_commits: usize,
    pub related_commits: usize,
    pub excluded_patterns: Vec<String>,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            default_branch: None,
            remote: DEFAULT_REMOTE.to_string(),
            recent_commits: DEFAULT_RECENT_COMMITS,
            related_commits: DEFAULT_RELATED_COMMITS,
            excluded_patterns: DEFAULT_EXCLUDED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub ai: AiSettings,
    pub git: GitSettings,
}

impl Settings {
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let ai = AiSettings {
            model: env_string("GIT_ACP_AI_MODEL").unwrap_or(defaults.ai.model),
            pr_model: env_string("GIT_ACP_PR_AI_MODEL"),
            temperature: env_parse("GIT_ACP_TEMPERATURE", DEFAULT_TEMPERATURE),
            base_url: env_string("GIT_ACP_BASE_URL").unwrap_or(defaults.ai.base_url),
            fallback_base_url: env_string("GIT_ACP_FALLBACK_BASE_URL"),
            api_key: env_string("GIT_ACP_API_KEY").unwrap_or(defaults.ai.api_key),
            timeout: ai_timeout(),
            prompt_mode: env_parse("GIT_ACP_PROMPT_TYPE", PromptMode::Advanced),
            context_window: env_parse("GIT_ACP_CONTEXT_WINDOW", DEFAULT_CONTEXT_WINDOW),
            min_diff_tokens: env_parse("GIT_ACP_MIN_DIFF_TOKENS", DEFAULT_MIN_DIFF_TOKENS),
        };

        let git = GitSettings {
            default_branch: env_string("GIT_ACP_DEFAULT_BRANCH"),
            remote: env_string("GIT_ACP_DEFAULT_REMOTE").unwrap_or(defaults.git.remote),
            recent_commits: env_parse("GIT_ACP_NUM_RECENT_COMMITS", DEFAULT_RECENT_COMMITS),
            related_commits: env_parse("GIT_ACP_NUM_RELATED_COMMITS", DEFAULT_RELATED_COMMITS),
            excluded_patterns: env_string("GIT_ACP_EXCLUDED_PATTERNS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.git.excluded_patterns),
        };

        Self { ai, git }
    }
}

/// Location of the optional config file.
pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("git-acp").join(".env"))
}

/// Load `KEY=value` pairs from `path` into the environment without overriding
/// variables that are already set. A missing file is not an error.
pub fn load_config_file(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path(path).map_err(|e| ConfigError::ConfigFile {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(true)
}

fn env_string(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => match v.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("Invalid {} value '{}', using default {:?}", key, v, default);
                default
            }
        },
        _ => default,
    }
}

/// Read the AI timeout, clamped to a sane range.
fn ai_timeout() -> Duration {
    let secs = env_parse("GIT_ACP_AI_TIMEOUT", DEFAULT_AI_TIMEOUT_SECS);
    let clamped = secs.clamp(MIN_AI_TIMEOUT_SECS, MAX_AI_TIMEOUT_SECS);
    if clamped != secs {
        warn!(
            "GIT_ACP_AI_TIMEOUT={}s is outside {}..={}s, using {}s",
            secs, MIN_AI_TIMEOUT_SECS, MAX_AI_TIMEOUT_SECS, clamped
        );
    }
    Duration::from_secs(clamped)
}
