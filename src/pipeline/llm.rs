//! Generation client: send one prompt, get one raw response back.
//!
//! The pipeline only depends on the [`GenerationClient`] trait; [`LlmClient`]
//! implements it on top of an `edgequake-llm` provider. Keeping the trait this
//! small lets tests substitute a canned response without a network.
//!
//! ## Retry Strategy
//!
//! Off by default (`max_retries = 0`). When enabled, failed calls are retried
//! with exponential backoff (`retry_backoff_ms * 2^attempt`). Retrying is a
//! client concern; the sanitisation pipeline never asks for a second answer.

use crate::config::DatasetConfig;
use crate::error::{DatasetError, DocumentError};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// Everything the model needs for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub system: String,
    pub content: String,
}

/// The unparsed model output plus token usage, when reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl GenerationResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Issues a generation request and returns the raw response.
///
/// Every failure (network, auth, rate limit, timeout) is a
/// [`DocumentError::Generation`].
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResponse, DocumentError>;
}

/// [`GenerationClient`] over an `edgequake-llm` provider.
pub struct LlmClient {
    provider: Arc<dyn LLMProvider>,
    max_retries: u32,
    retry_backoff_ms: u64,
    call_timeout: Duration,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &DatasetConfig) -> Self {
        Self {
            provider,
            max_retries: config.max_retries,
            retry_backoff_ms: config.retry_backoff_ms,
            call_timeout: Duration::from_secs(config.api_timeout_secs.max(1)),
        }
    }

    /// Resolve the provider from the config and wrap it.
    pub fn from_config(config: &DatasetConfig) -> Result<Self, DatasetError> {
        Ok(Self::new(resolve_provider(config)?, config))
    }

    async fn call(&self, request: &GenerationRequest) -> Result<GenerationResponse, DocumentError> {
        let messages = vec![
            ChatMessage::system(request.system.as_str()),
            ChatMessage::user(request.content.as_str()),
        ];
        let options = build_options(request);

        let mut last_err: Option<String> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let backoff = backoff_ms(self.retry_backoff_ms, attempt);
                warn!(
                    "Generation retry {}/{} after {}ms",
                    attempt, self.max_retries, backoff
                );
                sleep(Duration::from_millis(backoff)).await;
            }

            match timeout(self.call_timeout, self.provider.chat(&messages, Some(&options))).await {
                Ok(Ok(response)) => {
                    debug!(
                        "{} input tokens, {} output tokens",
                        response.prompt_tokens, response.completion_tokens
                    );
                    return Ok(GenerationResponse {
                        text: response.content,
                        input_tokens: response.prompt_tokens as u64,
                        output_tokens: response.completion_tokens as u64,
                    });
                }
                Ok(Err(e)) => {
                    let err_msg = format!("{}", e);
                    warn!("Generation attempt {} failed — {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
                Err(_) => {
                    let err_msg = format!(
                        "call timed out after {}s",
                        self.call_timeout.as_secs()
                    );
                    warn!("Generation attempt {} failed — {}", attempt + 1, err_msg);
                    last_err = Some(err_msg);
                }
            }
        }

        Err(DocumentError::Generation {
            detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
        })
    }
}

#[async_trait::async_trait]
impl GenerationClient for LlmClient {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, DocumentError> {
        self.call(request).await
    }
}

/// Delay before retry `attempt` (1-based): `base * 2^(attempt - 1)`, saturating.
fn backoff_ms(base: u64, attempt: u32) -> u64 {
    base.saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
}

/// Build `CompletionOptions` from the request.
fn build_options(request: &GenerationRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

/// Resolve the LLM provider: a pre-built one wins, otherwise the named
/// provider is created with the configured model. The factory reads the
/// provider's API key from the environment.
pub fn resolve_provider(config: &DatasetConfig) -> Result<Arc<dyn LLMProvider>, DatasetError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    ProviderFactory::create_llm_provider(&config.provider_name, &config.model).map_err(|e| {
        DatasetError::ProviderNotConfigured {
            provider: config.provider_name.clone(),
            hint: format!("{e}"),
        }
    })
}
