//! OpenAI-compatible chat-completion client with a primary and an optional
//! fallback endpoint.
//!
//! The fallback is tried once, and only when the primary cannot be reached.
//! An error response from a reachable endpoint is returned as-is.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::AiSettings;
use crate::error::{AiError, EndpointFailure};

/// Connection establishment limit per endpoint. The overall request
/// deadline is enforced separately.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum characters of an error body kept in [`AiError::Api`].
const MAX_ERROR_BODY: usize = 500;

static THINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("think regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
        }
    }

    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }
}

/// One chat-completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
    /// Sent to the backend only when set explicitly.
    pub context_window: Option<usize>,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ModelOptions>,
}

/// Backend-specific model options (honored by Ollama).
#[derive(Serialize)]
struct ModelOptions {
    num_ctx: usize,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// A chat-completion base URL and its API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub api_key: String,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Something that can answer a chat-completion request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn chat_completion(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AiError>;
}

enum AttemptError {
    /// The endpoint could not be reached; the next one may be tried.
    Unreachable(String),
    Failed(AiError),
}

/// HTTP client over an ordered list of endpoints.
pub struct AiClient {
    http: reqwest::Client,
    endpoints: Vec<Endpoint>,
}

impl AiClient {
    pub fn new(primary: Endpoint, fallback: Option<Endpoint>) -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AiError::Request(e.to_string()))?;
        let endpoints = std::iter::once(primary).chain(fallback).collect();
        Ok(Self { http, endpoints })
    }

    pub fn from_settings(settings: &AiSettings) -> Result<Self, AiError> {
        let primary = Endpoint::new(&settings.base_url, &settings.api_key);
        let fallback = settings
            .fallback_base_url
            .as_ref()
            .map(|url| Endpoint::new(url, &settings.api_key));
        Self::new(primary, fallback)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    async fn try_endpoints(&self, request: &ChatRequest) -> Result<String, AiError> {
        if self.endpoints.is_empty() {
            return Err(AiError::NoEndpoint);
        }

        let mut attempts = Vec::new();
        for endpoint in &self.endpoints {
            let url = endpoint.completions_url();
            match self.send(&url, endpoint, request).await {
                Ok(text) => {
                    if !attempts.is_empty() {
                        warn!("Primary AI endpoint unreachable, answered by fallback {}", url);
                    }
                    return Ok(text);
                }
                Err(AttemptError::Unreachable(reason)) => {
                    debug!("AI endpoint {} unreachable: {}", url, reason);
                    attempts.push(EndpointFailure { url, reason });
                }
                Err(AttemptError::Failed(err)) => return Err(err),
            }
        }

        Err(AiError::ConnectionFailed { attempts })
    }

    async fn send(
        &self,
        url: &str,
        endpoint: &Endpoint,
        request: &ChatRequest,
    ) -> Result<String, AttemptError> {
        let body = CompletionBody {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            stream: false,
            options: request.context_window.map(|num_ctx| ModelOptions { num_ctx }),
        };

        debug!(
            "POST {} (model {}, {} messages)",
            url,
            request.model,
            request.messages.len()
        );

        let response = self
            .http
            .post(url)
            .bearer_auth(&endpoint.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    AttemptError::Unreachable(e.to_string())
                } else {
                    AttemptError::Failed(AiError::Request(e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AttemptError::Failed(AiError::Api {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY).collect(),
            }));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            AttemptError::Failed(AiError::Request(format!("invalid response body: {e}")))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .unwrap_or_default();

        let cleaned = clean_response(&content);
        if cleaned.is_empty() {
            return Err(AttemptError::Failed(AiError::EmptyResponse));
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl ChatBackend for AiClient {
    async fn chat_completion(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<String, AiError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AiError::Cancelled),
            result = tokio::time::timeout(request.timeout, self.try_endpoints(request)) => {
                result.unwrap_or(Err(AiError::Timeout(request.timeout.as_secs())))
            }
        }
    }
}

/// Strip reasoning blocks and wrapping the model was told not to add.
pub fn clean_response(content: &str) -> String {
    let without_think = THINK_RE.replace_all(content, "");
    let mut text = without_think.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }
    if text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')))
    {
        text = text[1..text.len() - 1].trim();
    }

    text.to_string()
}
