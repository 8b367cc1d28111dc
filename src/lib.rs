//! # edgequake-pdf2qa
//!
//! Turn a folder of PDF technical documentation into a question/answer
//! training dataset using Large Language Models.
//!
//! ## Why this crate?
//!
//! Asking a model for "a JSON array of question/answer objects" is easy;
//! getting one back is not. Responses arrive wrapped in Markdown fences, with
//! objects glued together, trailing commas, and unescaped backslashes from the
//! code snippets the answers quote. This crate recovers well-formed records
//! from that output with a deterministic sanitise → repair → validate pipeline
//! and appends them to a line-delimited dataset file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! data/*.pdf
//!  │
//!  ├─ 1. Extract   full document text via pdfium (spawn_blocking)
//!  ├─ 2. Prompt    instructions + pair count + category split + text
//!  ├─ 3. Generate  one LLM call per document (claude / gpt / gemini / …)
//!  ├─ 4. Sanitise  strip fences, frame as array, repair punctuation
//!  ├─ 5. Validate  keep objects with non-blank "question" and "answer"
//!  └─ 6. Append    one {"conversations": [...]} line per record
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2qa::{generate_dataset, DatasetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads ANTHROPIC_API_KEY from the environment
//!     let config = DatasetConfig::builder()
//!         .data_dir("data")
//!         .output_path("dataset.jsonl")
//!         .build()?;
//!     let output = generate_dataset(&config).await?;
//!     eprintln!(
//!         "{} records from {}/{} documents",
//!         output.stats.records_written,
//!         output.stats.succeeded_documents,
//!         output.stats.total_documents
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2qa` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2qa = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DatasetConfig, DatasetConfigBuilder, PromptPolicy, QuestionCategory};
pub use dataset::DatasetSink;
pub use error::{DatasetError, DocumentError, ResponseError};
pub use generate::{generate_dataset, generate_dataset_sync, generate_with};
pub use output::{DatasetSummary, DocumentReport, RunOutput, RunStats};
pub use pipeline::extract::{PdfiumExtractor, TextExtractor};
pub use pipeline::llm::{GenerationClient, GenerationRequest, GenerationResponse, LlmClient};
pub use pipeline::records_from_response;
pub use pipeline::sanitize::{normalize, repair};
pub use pipeline::validate::{validate, validate_records};
pub use progress::{DatasetProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{ConversationRecord, QaRecord, Speaker, Turn};
