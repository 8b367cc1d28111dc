//! Configuration types for PDF-to-dataset generation.
//!
//! All run behaviour is controlled through [`DatasetConfig`], built via its
//! [`DatasetConfigBuilder`]. Model-interaction knobs (pair count, category
//! weighting, system instructions) live in the same struct as the I/O paths so
//! a run is fully described by one value that can be logged and diffed.
//!
//! Two validation steps exist on purpose:
//!
//! * [`DatasetConfigBuilder::build`] checks that values are internally
//!   consistent (ranges, weights). It never looks at the environment.
//! * [`DatasetConfig::validate`] is the startup check against the outside
//!   world: the data folder exists and the provider's credential is present.

use crate::error::DatasetError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default provider when none is named.
pub const DEFAULT_PROVIDER: &str = "anthropic";

/// Default model for [`DEFAULT_PROVIDER`].
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

/// Configuration for one dataset-generation run.
///
/// # Example
/// ```rust
/// use edgequake_pdf2qa::DatasetConfig;
///
/// let config = DatasetConfig::builder()
///     .data_dir("docs")
///     .output_path("train.jsonl")
///     .pair_count(10)
///     .temperature(0.2)
///     .build()
///     .unwrap();
/// assert_eq!(config.prompt.pair_count, 10);
/// ```
#[derive(Clone)]
pub struct DatasetConfig {
    /// Folder scanned (non-recursively) for `*.pdf` files. Default: `data`.
    pub data_dir: PathBuf,

    /// Line-delimited dataset file, opened in append mode. Default: `dataset.jsonl`.
    pub output_path: PathBuf,

    /// LLM provider name understood by `edgequake-llm`. Default: `anthropic`.
    pub provider_name: String,

    /// Model identifier. Default: `claude-3-5-haiku-latest`.
    pub model: String,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`
    /// and skips the credential check.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Maximum tokens the model may generate per document. Default: 8192.
    ///
    /// Twenty detailed answers with code listings routinely exceed 4 000
    /// tokens; a truncated response loses its closing bracket and every
    /// record after the cut.
    pub max_tokens: usize,

    /// Sampling temperature, clamped to `[0, 1]`. Default: 0.3.
    pub temperature: f32,

    /// Custom system instructions. If None, uses the built-in default.
    pub system_prompt: Option<String>,

    /// How many pairs to ask for and how to split them across categories.
    pub prompt: PromptPolicy,

    /// Documents processed at once. Default: 1 (strictly sequential).
    pub concurrency: usize,

    /// Retries per document on a failed generation call. Default: 0.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-generation-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Receives one event per document. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_path: PathBuf::from("dataset.jsonl"),
            provider_name: DEFAULT_PROVIDER.to_string(),
            model: DEFAULT_MODEL.to_string(),
            provider: None,
            max_tokens: 8192,
            temperature: 0.3,
            system_prompt: None,
            prompt: PromptPolicy::default(),
            concurrency: 1,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DatasetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatasetConfig")
            .field("data_dir", &self.data_dir)
            .field("output_path", &self.output_path)
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("prompt", &self.prompt)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DatasetProgressCallback>"),
            )
            .finish()
    }
}

impl DatasetConfig {
    /// Create a new builder for `DatasetConfig`.
    pub fn builder() -> DatasetConfigBuilder {
        DatasetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Startup validation against the environment.
    ///
    /// Fails with a configuration error before any document is touched if the
    /// data folder is missing or the provider's API key is not set.
    pub fn validate(&self) -> Result<(), DatasetError> {
        self.validate_with_env(|key| std::env::var(key).ok())
    }

    fn validate_with_env(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), DatasetError> {
        if !self.data_dir.is_dir() {
            return Err(DatasetError::DataDirNotFound {
                path: self.data_dir.clone(),
            });
        }

        if self.provider.is_some() {
            return Ok(());
        }

        if let Some(env_var) = credential_env_var(&self.provider_name) {
            let present = lookup(env_var).is_some_and(|v| !v.trim().is_empty());
            if !present {
                return Err(DatasetError::MissingCredential {
                    provider: self.provider_name.clone(),
                    env_var: env_var.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Environment variable holding the API key for a provider, if it needs one.
///
/// Local providers (`ollama`, `lmstudio`) and unknown names return `None`;
/// for those the provider factory reports problems itself.
pub fn credential_env_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "anthropic" | "claude" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        "openrouter" => Some("OPENROUTER_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "azure" => Some("AZURE_OPENAI_API_KEY"),
        _ => None,
    }
}

/// Builder for [`DatasetConfig`].
#[derive(Debug)]
pub struct DatasetConfigBuilder {
    config: DatasetConfig,
}

impl DatasetConfigBuilder {
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.data_dir = dir.into();
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = name.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn prompt_policy(mut self, policy: PromptPolicy) -> Self {
        self.config.prompt = policy;
        self
    }

    pub fn pair_count(mut self, n: usize) -> Self {
        self.config.prompt.pair_count = n;
        self
    }

    pub fn categories(mut self, categories: Vec<QuestionCategory>) -> Self {
        self.config.prompt.categories = categories;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating internal constraints.
    pub fn build(self) -> Result<DatasetConfig, DatasetError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(DatasetError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.max_tokens == 0 {
            return Err(DatasetError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.provider.is_none() && c.provider_name.trim().is_empty() {
            return Err(DatasetError::InvalidConfig("provider name is empty".into()));
        }
        c.prompt.check()?;
        Ok(self.config)
    }
}

// ── Prompt policy ────────────────────────────────────────────────────────

/// A thematic slice of the requested pairs, e.g. "60% code examples".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionCategory {
    /// Short description inserted into the prompt.
    pub label: String,
    /// Share of the requested pairs, in percent.
    pub percent: u8,
}

impl QuestionCategory {
    pub fn new(label: impl Into<String>, percent: u8) -> Self {
        Self {
            label: label.into(),
            percent,
        }
    }
}

/// What the prompt asks the model for.
///
/// Empty `categories` means no distribution is requested; otherwise the
/// percentages must add up to exactly 100.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPolicy {
    /// Number of question/answer pairs requested per document. Default: 20.
    pub pair_count: usize,
    /// Category split. Default: 60 / 20 / 20 over code, concepts, use cases.
    pub categories: Vec<QuestionCategory>,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self {
            pair_count: 20,
            categories: vec![
                QuestionCategory::new("questions about specific code examples from the documentation", 60),
                QuestionCategory::new("questions about documented concepts and their implementation", 20),
                QuestionCategory::new("questions about documented use cases and best practices", 20),
            ],
        }
    }
}

impl PromptPolicy {
    fn check(&self) -> Result<(), DatasetError> {
        if self.pair_count == 0 {
            return Err(DatasetError::InvalidConfig("pair count must be ≥ 1".into()));
        }
        if !self.categories.is_empty() {
            let total: u32 = self.categories.iter().map(|c| c.percent as u32).sum();
            if total != 100 {
                return Err(DatasetError::InvalidConfig(format!(
                    "category percentages must sum to 100, got {total}"
                )));
            }
        }
        Ok(())
    }
}
