//! GitHub token lookup.
//!
//! Order:
//! 1. GITHUB_TOKEN env var
//! 2. GH_TOKEN env var
//! 3. `gh auth token` (gh CLI)

use std::env;
use std::process::Command;

use tracing::debug;

use crate::error::GitHubError;

/// Get a GitHub token from the environment or the gh CLI.
pub fn get_github_token() -> Result<String, GitHubError> {
    if let Some(token) = token_from_env() {
        return Ok(token);
    }
    if let Some(token) = token_from_gh_cli() {
        debug!("Using GitHub token from gh CLI");
        return Ok(token);
    }
    Err(GitHubError::AuthenticationFailed)
}

fn token_from_env() -> Option<String> {
    ["GITHUB_TOKEN", "GH_TOKEN"].into_iter().find_map(|name| {
        env::var(name)
            .ok()
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    })
}

fn token_from_gh_cli() -> Option<String> {
    let gh = which::which("gh").ok()?;
    let output = Command::new(gh).args(["auth", "token"]).output().ok()?;
    if !output.status.success() {
        return None;
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!token.is_empty()).then_some(token)
}
