use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::throttle::jitter;
use super::{Reasoner, ReasoningError};
use crate::config::ReasonerConfig;
use crate::prompt::PromptRequest;

const SYSTEM_PROMPT: &str =
    "You are an assistant for an international education consultancy. Reply with a single JSON object that satisfies the supplied schema.";
const BASE_BACKOFF_MS: u64 = 500;
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    json_schema: NamedSchema<'a>,
}

#[derive(Debug, Serialize)]
struct NamedSchema<'a> {
    name: &'a str,
    schema: &'a Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}

/// Chat-completions client with retry, backoff and `Retry-After` handling.
#[derive(Clone)]
pub struct HttpReasoner {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_retries: u32,
    jitter_ms: u64,
}

impl HttpReasoner {
    pub fn new(config: &ReasonerConfig, jitter_ms: u64) -> Result<Self, ReasoningError> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| ReasoningError::Unavailable("endpoint not configured".to_string()))?;
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
            jitter_ms,
        })
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.post(&self.endpoint).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        request.send().await
    }
}

#[async_trait]
impl Reasoner for HttpReasoner {
    async fn invoke(&self, request: &PromptRequest) -> Result<Value, ReasoningError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: ResponseFormat {
                kind: "json_schema",
                json_schema: NamedSchema {
                    name: &request.name,
                    schema: &request.schema,
                },
            },
        };

        let mut last_error: Option<ReasoningError> = None;
        let mut retry_after: Option<Duration> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = retry_after
                    .take()
                    .unwrap_or_else(|| backoff_delay(attempt))
                    + jitter(self.jitter_ms);
                warn!(
                    prompt = %request.name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying reasoning call"
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.send(&body).await {
                Ok(response) => response,
                Err(error) => {
                    last_error = Some(ReasoningError::Transport(error));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let secs = parse_retry_after(response.headers());
                warn!(prompt = %request.name, retry_after_secs = secs, "reasoner rate limited");
                retry_after = Some(retry_wait(secs));
                last_error = Some(ReasoningError::RateLimited {
                    retries: self.max_retries,
                });
                continue;
            }

            if status.is_server_error() {
                let message = response.text().await.unwrap_or_default();
                last_error = Some(ReasoningError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(ReasoningError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let body = response.text().await?;
            let output = decode_chat_body(&body)?;
            debug!(prompt = %request.name, bytes = body.len(), "reasoning call succeeded");
            return Ok(output);
        }

        Err(last_error
            .unwrap_or_else(|| ReasoningError::Unavailable("no attempts were made".to_string())))
    }
}

/// Pull the model's JSON answer out of a successful response body. A body
/// that is not a chat completion counts as unusable output, not transport.
fn decode_chat_body(body: &str) -> Result<Value, ReasoningError> {
    let parsed: ChatResponse = serde_json::from_str(body)?;
    let content = parsed.content().ok_or(ReasoningError::EmptyContent)?;
    Ok(serde_json::from_str(strip_json_fences(content))?)
}

/// Exponential backoff: 500 ms, 1 s, 2 s, ... capped at 30 s.
fn backoff_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    Duration::from_millis(BASE_BACKOFF_MS.saturating_mul(1 << exponent)).min(MAX_BACKOFF)
}

/// Server-provided `Retry-After`, capped like the backoff schedule.
fn retry_wait(retry_after_secs: u64) -> Duration {
    Duration::from_secs(retry_after_secs).min(MAX_BACKOFF)
}

/// `Retry-After` in seconds, falling back to 60 s when absent or unparseable.
fn parse_retry_after(headers: &HeaderMap) -> u64 {
    headers
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

/// Strip a ```json ... ``` or ``` ... ``` wrapper some models add.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}
