pub mod hosted;
pub mod intent;
pub mod ollama;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        messages: &[Message],
    ) -> Result<String, LlmError>;
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider server error ({0})")]
    Server(u16),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("provider API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("malformed provider response: {0}")]
    Malformed(String),

    #[error("no language models configured")]
    NoModels,
}

impl LlmError {
    /// Errors worth retrying against the same model.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Transport(_) | LlmError::RateLimited | LlmError::Server(_)
        )
    }

    /// Maps a non-success HTTP status from a provider to an error.
    pub fn from_status(status: u16, body: &str, model: &str) -> Self {
        match status {
            429 => LlmError::RateLimited,
            500..=599 => LlmError::Server(status),
            404 => LlmError::ModelUnavailable(model.to_string()),
            400 | 422 if mentions_missing_model(body) => {
                LlmError::ModelUnavailable(model.to_string())
            }
            _ => LlmError::Api {
                status,
                body: body.to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Malformed(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

fn mentions_missing_model(body: &str) -> bool {
    let body = body.to_lowercase();
    body.contains("model_not_found")
        || (body.contains("model")
            && ["not found", "does not exist", "decommissioned", "not supported"]
                .iter()
                .any(|needle| body.contains(needle)))
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_retries: config.llm_max_retries,
            backoff: Duration::from_millis(config.llm_retry_backoff_ms),
        }
    }
}

/// Calls the provider with each model in `models` until one answers.
///
/// Transient failures are retried on the same model up to
/// `policy.max_retries` attempts with linear backoff, then the next model is
/// tried. An unavailable model is skipped immediately. Any other error is
/// returned without trying further models.
pub async fn chat_with_fallback(
    llm: &dyn LlmProvider,
    models: &[String],
    policy: &RetryPolicy,
    system_prompt: &str,
    messages: &[Message],
) -> Result<String, LlmError> {
    let attempts = policy.max_retries.max(1);
    let mut last_error = None;

    for model in models {
        for attempt in 1..=attempts {
            match llm.chat(model, system_prompt, messages).await {
                Ok(reply) => {
                    if attempt > 1 || last_error.is_some() {
                        tracing::info!(model = %model, attempt, "LLM call recovered");
                    }
                    return Ok(reply);
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(model = %model, attempt, error = %e, "transient LLM error");
                    last_error = Some(e);
                    if attempt < attempts && !policy.backoff.is_zero() {
                        tokio::time::sleep(policy.backoff * attempt).await;
                    }
                }
                Err(e @ LlmError::ModelUnavailable(_)) => {
                    tracing::warn!(model = %model, error = %e, "model unavailable, falling back");
                    last_error = Some(e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }
    }

    Err(last_error.unwrap_or(LlmError::NoModels))
}
