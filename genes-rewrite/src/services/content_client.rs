//! Generative API client with bounded retry
//!
//! The backend is behind `ContentApi` and reports one of three outcomes as a
//! value. `RetryPolicy::decide` turns an outcome plus attempt number into
//! "retry after" or "stop"; `ContentClient::fetch` only runs that loop.

use crate::error::{RewriteError, RewriteResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Default generator model
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
/// Default output token ceiling per call
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
/// Default attempts per batch, first call included
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the first retry; doubles per attempt
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(2);

/// Result of one API call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiOutcome {
    /// Raw response text
    Success(String),
    /// Rate limit, timeout, server error: worth retrying
    Transient(String),
    /// Auth failure, malformed request: retrying cannot help
    Fatal(String),
}

/// One generation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    /// Rendered batch prompt, sent as the single user message
    pub prompt: String,
}

/// Generative text backend
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> ApiOutcome;

    fn provider_name(&self) -> &str;
}

/// Anthropic Messages API backend
pub struct AnthropicApi {
    api_key: String,
    http_client: reqwest::Client,
    endpoint: String,
}

impl AnthropicApi {
    pub fn new(api_key: impl Into<String>) -> RewriteResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| RewriteError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key: api_key.into(),
            http_client,
            endpoint: ANTHROPIC_MESSAGES_URL.to_string(),
        })
    }

    /// Point at a different Messages endpoint (proxies, local mocks)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct ContentSegment {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentSegment>,
}

#[async_trait]
impl ContentApi for AnthropicApi {
    async fn generate(&self, request: &GenerationRequest) -> ApiOutcome {
        let body = serde_json::json!({
            "model": &request.model,
            "max_tokens": request.max_tokens,
            "system": &request.system,
            "messages": [{"role": "user", "content": &request.prompt}]
        });

        tracing::debug!(
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Calling Anthropic Messages API"
        );

        let response = match self
            .http_client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_builder() => return ApiOutcome::Fatal(format!("invalid request: {}", e)),
            Err(e) => return ApiOutcome::Transient(format!("network error: {}", e)),
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return classify_status(status, &error_text);
        }

        match response.json::<MessagesResponse>().await {
            Ok(parsed) => extract_text(parsed),
            Err(e) => ApiOutcome::Transient(format!("unreadable response body: {}", e)),
        }
    }

    fn provider_name(&self) -> &str {
        "Anthropic"
    }
}

/// Outcome for a non-success HTTP status
pub fn classify_status(status: StatusCode, body: &str) -> ApiOutcome {
    let reason = if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body)
    };

    match status.as_u16() {
        408 | 409 | 425 | 429 | 529 => ApiOutcome::Transient(reason),
        _ if status.is_server_error() => ApiOutcome::Transient(reason),
        _ => ApiOutcome::Fatal(reason),
    }
}

fn extract_text(response: MessagesResponse) -> ApiOutcome {
    let text = response
        .content
        .into_iter()
        .filter(|segment| segment.kind == "text")
        .filter_map(|segment| segment.text)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();

    if text.is_empty() {
        ApiOutcome::Transient("empty response".to_string())
    } else {
        ApiOutcome::Success(text.to_string())
    }
}

/// Next step after an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    Stop,
}

/// Bounded exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included (minimum 1)
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }

    pub fn decide(&self, outcome: &ApiOutcome, attempt: u32) -> RetryDecision {
        match outcome {
            ApiOutcome::Transient(_) if attempt < self.max_attempts.max(1) => {
                RetryDecision::RetryAfter(self.delay_for(attempt))
            }
            _ => RetryDecision::Stop,
        }
    }
}

/// Result of fetching one batch response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Completed(String),
    /// Every attempt was transient; the batch is skipped
    Exhausted {
        attempts: u32,
        delays: Vec<Duration>,
        last_reason: String,
    },
}

/// Drives one backend under a retry policy
#[derive(Clone)]
pub struct ContentClient {
    api: Arc<dyn ContentApi>,
    policy: RetryPolicy,
}

impl ContentClient {
    pub fn new(api: Arc<dyn ContentApi>, policy: RetryPolicy) -> Self {
        Self { api, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn provider_name(&self) -> &str {
        self.api.provider_name()
    }

    /// Call until success, a fatal outcome, or the attempt bound
    ///
    /// Fatal outcomes come back as `RewriteError::FatalApi`; exhaustion is a
    /// value so the caller can skip the batch and carry on.
    pub async fn fetch(&self, request: &GenerationRequest) -> RewriteResult<FetchOutcome> {
        let mut delays = Vec::new();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let outcome = self.api.generate(request).await;
            let decision = self.policy.decide(&outcome, attempt);

            match outcome {
                ApiOutcome::Success(text) => {
                    if attempt > 1 {
                        tracing::info!(attempt, "API call succeeded after retry");
                    }
                    return Ok(FetchOutcome::Completed(text));
                }
                ApiOutcome::Fatal(reason) => {
                    tracing::error!(attempt, %reason, "Fatal API error");
                    return Err(RewriteError::FatalApi(reason));
                }
                ApiOutcome::Transient(reason) => match decision {
                    RetryDecision::RetryAfter(delay) => {
                        tracing::warn!(
                            attempt,
                            max_attempts = self.policy.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            %reason,
                            "Transient API error, will retry after backoff"
                        );
                        delays.push(delay);
                        tokio::time::sleep(delay).await;
                    }
                    RetryDecision::Stop => {
                        tracing::error!(
                            attempts = attempt,
                            %reason,
                            "API retries exhausted"
                        );
                        return Ok(FetchOutcome::Exhausted {
                            attempts: attempt,
                            delays,
                            last_reason: reason,
                        });
                    }
                },
            }
        }
    }
}
