//! GitHub API operations using octocrab.

pub mod auth;
pub mod pulls;

pub use auth::get_github_token;
pub use pulls::{
    CreatedPullRequest, NewPullRequest, create_pull_request, create_pull_request_with_client,
    parse_github_remote,
};
