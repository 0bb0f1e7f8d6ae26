//! Boundary to the external reasoner. Callers hand over a [`PromptRequest`]
//! and get back JSON that has been checked against the request's schema.

mod http;
mod structured;
mod throttle;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::warn;

use crate::config::{ReasonerConfig, ThrottleConfig};
use crate::prompt::PromptRequest;

pub use http::HttpReasoner;
pub use structured::{validate_output, StructuredReasoner};
pub use throttle::{Throttle, ThrottlePermit};

/// Raw prompt-in, JSON-out call. Implementations do not validate the shape.
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn invoke(&self, request: &PromptRequest) -> Result<Value, ReasoningError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ReasoningError {
    #[error("reasoner transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reasoner API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("reasoner rate limited after {retries} retries")]
    RateLimited { retries: u32 },
    #[error("reasoner returned empty content")]
    EmptyContent,
    #[error("reasoner output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("reasoner output violates its schema: {}", errors.join("; "))]
    Validation { errors: Vec<String> },
    #[error("output schema is invalid: {0}")]
    InvalidSchema(String),
    #[error("reasoner unavailable: {0}")]
    Unavailable(String),
}

impl ReasoningError {
    /// True when the reasoner answered but the answer was unusable.
    pub fn is_invalid_output(&self) -> bool {
        matches!(
            self,
            ReasoningError::EmptyContent
                | ReasoningError::Parse(_)
                | ReasoningError::Validation { .. }
        )
    }
}

/// Stand-in used when no endpoint is configured.
#[derive(Debug, Clone)]
pub struct DisabledReasoner {
    reason: String,
}

impl DisabledReasoner {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Reasoner for DisabledReasoner {
    async fn invoke(&self, _request: &PromptRequest) -> Result<Value, ReasoningError> {
        Err(ReasoningError::Unavailable(self.reason.clone()))
    }
}

/// Pick the HTTP reasoner when an endpoint is configured, otherwise the
/// disabled stand-in, and wrap it with throttling and output validation.
pub fn reasoner_from_config(
    reasoner: &ReasonerConfig,
    throttle: &ThrottleConfig,
) -> Result<StructuredReasoner, ReasoningError> {
    let inner: Arc<dyn Reasoner> = if reasoner.is_configured() {
        Arc::new(HttpReasoner::new(reasoner, throttle.jitter_ms)?)
    } else {
        warn!("REASONER_ENDPOINT is not set; reasoning endpoints will return errors");
        Arc::new(DisabledReasoner::new("REASONER_ENDPOINT is not configured"))
    };
    Ok(StructuredReasoner::new(inner, Throttle::new(throttle)))
}
