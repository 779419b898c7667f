//! Pull request creation via octocrab.

use octocrab::Octocrab;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GitHubError;

/// Request body for `POST /repos/{owner}/{repo}/pulls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Branch holding the changes.
    pub head: String,
    /// Branch the changes should be merged into.
    pub base: String,
    pub draft: bool,
}

/// The fields of GitHub's response that get reported back.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub html_url: String,
}

/// Open a pull request using a token.
///
/// This is the main entry point that constructs the octocrab client.
pub async fn create_pull_request(
    token: &str,
    owner: &str,
    repo: &str,
    pull: &NewPullRequest,
) -> Result<CreatedPullRequest, GitHubError> {
    let octocrab = Octocrab::builder()
        .personal_token(token.to_string())
        .build()
        .map_err(|e| GitHubError::Request(Box::new(e)))?;

    create_pull_request_with_client(&octocrab, owner, repo, pull).await
}

/// Open a pull request using a pre-configured octocrab client.
pub async fn create_pull_request_with_client(
    octocrab: &Octocrab,
    owner: &str,
    repo: &str,
    pull: &NewPullRequest,
) -> Result<CreatedPullRequest, GitHubError> {
    let route = format!("/repos/{owner}/{repo}/pulls");
    let created: CreatedPullRequest = octocrab
        .post(route, Some(pull))
        .await
        .map_err(|e| classify_error(e, owner, repo))?;

    info!("Opened pull request #{} ({})", created.number, created.html_url);
    Ok(created)
}

fn classify_error(err: octocrab::Error, owner: &str, repo: &str) -> GitHubError {
    let octocrab::Error::GitHub { source, .. } = &err else {
        return GitHubError::Request(Box::new(err));
    };

    let status = source.status_code.as_u16();
    match status {
        401 => GitHubError::AuthenticationFailed,
        404 => GitHubError::RepositoryNotFound {
            owner: owner.to_string(),
            repo: repo.to_string(),
        },
        403 if source.message.to_lowercase().contains("rate limit") => GitHubError::RateLimited,
        _ => {
            // Validation failures carry the useful part in `errors`.
            let details: Vec<String> = source
                .errors
                .iter()
                .flatten()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .map(String::from)
                .collect();
            let message = if details.is_empty() {
                source.message.clone()
            } else {
                format!("{}: {}", source.message, details.join("; "))
            };
            GitHubError::Rejected { status, message }
        }
    }
}

/// Extract owner and repo from a git remote URL.
pub fn parse_github_remote(url: &str) -> Result<(String, String), GitHubError> {
    let invalid = || GitHubError::InvalidRepositoryUrl(url.to_string());
    let url = url.trim();

    // SSH format: git@github.com:owner/repo.git
    if let Some(path) = url.strip_prefix("git@github.com:") {
        return parse_owner_repo_path(path).ok_or_else(invalid);
    }

    // HTTPS and ssh:// formats: https://github.com/owner/repo.git
    if let Some((_, path)) = url.split_once("github.com/") {
        return parse_owner_repo_path(path).ok_or_else(invalid);
    }

    Err(invalid())
}

fn parse_owner_repo_path(path: &str) -> Option<(String, String)> {
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');

    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty() => {
            Some((owner.to_string(), repo.to_string()))
        }
        _ => None,
    }
}
