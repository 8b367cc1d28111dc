//! Error types for the edgequake-pdf2qa library.
//!
//! Three error types reflect three distinct failure scopes:
//!
//! * [`DatasetError`] is **fatal**: the run cannot start or cannot continue
//!   (missing credential, missing data folder, bad configuration). Returned as
//!   `Err(DatasetError)` from the top-level `generate*` functions.
//!
//! * [`DocumentError`] is **non-fatal**: a single document failed (unreadable
//!   PDF, provider error, unusable response). Stored inside
//!   [`crate::output::DocumentReport`]; the run moves on to the next document.
//!
//! * [`ResponseError`] says why a model response produced zero records. Kept
//!   separate from generation failures so "the call failed" and "the call
//!   returned nothing usable" never look alike in a report.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2qa library.
///
/// Document-level failures use [`DocumentError`] and are stored in
/// [`crate::output::DocumentReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DatasetError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// The provider needs an API key and the environment does not have one.
    #[error("{env_var} is not set (required by provider '{provider}')\nAdd it to your environment or to a .env file.")]
    MissingCredential { provider: String, env_var: String },

    /// The input folder does not exist or is not a directory.
    #[error("Data folder not found: '{path}'")]
    DataDirNotFound { path: PathBuf },

    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// The input folder exists but could not be listed.
    #[error("Failed to read data folder '{path}': {source}")]
    DataDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The dataset file could not be read back for the summary.
    #[error("Failed to summarise dataset '{path}': {source}")]
    SummaryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DatasetError {
    /// True for the errors raised by startup validation.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            DatasetError::MissingCredential { .. }
                | DatasetError::DataDirNotFound { .. }
                | DatasetError::ProviderNotConfigured { .. }
                | DatasetError::InvalidConfig(_)
        )
    }
}

/// A non-fatal error for a single document.
///
/// The pipeline records it, counts the document as "zero records" and carries
/// on with the next one.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum DocumentError {
    /// The PDF could not be opened or its text could not be read.
    #[error("text extraction failed: {detail}")]
    Extraction { detail: String },

    /// The generation call failed (network, auth, rate limit, timeout).
    #[error("generation failed: {detail}")]
    Generation { detail: String },

    /// The model answered but the answer yielded no records.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Appending this document's records to the dataset failed.
    #[error("dataset write failed: {detail}")]
    Write { detail: String },
}

impl DocumentError {
    /// Short, stable name of the error kind, for log lines and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            DocumentError::Extraction { .. } => "ExtractionError",
            DocumentError::Generation { .. } => "GenerationError",
            DocumentError::Response(e) => e.kind(),
            DocumentError::Write { .. } => "WriteError",
        }
    }
}

/// Why a model response could not be turned into records.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ResponseError {
    /// The repaired text is still not valid JSON.
    #[error("malformed response at byte {offset} (line {line}, column {column}): {message}\n  near: {context:?}")]
    Malformed {
        offset: usize,
        line: usize,
        column: usize,
        message: String,
        context: String,
    },

    /// Valid JSON, but not an array.
    #[error("unexpected response shape: expected a JSON array, got {found}")]
    UnexpectedShape { found: String },

    /// A non-empty array in which no element was a usable record.
    #[error("no valid question/answer records among {total} elements")]
    NoValidRecords { total: usize },
}

impl ResponseError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResponseError::Malformed { .. } => "MalformedResponse",
            ResponseError::UnexpectedShape { .. } => "UnexpectedShape",
            ResponseError::NoValidRecords { .. } => "NoValidRecords",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credential_display() {
        let e = DatasetError::MissingCredential {
            provider: "anthropic".into(),
            env_var: "ANTHROPIC_API_KEY".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("ANTHROPIC_API_KEY"), "got: {msg}");
        assert!(msg.contains("anthropic"), "got: {msg}");
        assert!(e.is_configuration());
    }

    #[test]
    fn io_errors_are_not_configuration() {
        let e = DatasetError::SummaryFailed {
            path: PathBuf::from("dataset.jsonl"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
        };
        assert!(!e.is_configuration());
    }

    #[test]
    fn malformed_display_includes_offset_and_context() {
        let e = ResponseError::Malformed {
            offset: 17,
            line: 1,
            column: 18,
            message: "expected value".into(),
            context: "[{\"question\": ,".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("byte 17"), "got: {msg}");
        assert!(msg.contains("question"), "got: {msg}");
    }

    #[test]
    fn document_error_kinds() {
        assert_eq!(
            DocumentError::Extraction { detail: "x".into() }.kind(),
            "ExtractionError"
        );
        assert_eq!(
            DocumentError::Generation { detail: "x".into() }.kind(),
            "GenerationError"
        );
        let e: DocumentError = ResponseError::NoValidRecords { total: 3 }.into();
        assert_eq!(e.kind(), "NoValidRecords");
        assert!(e.to_string().contains("3 elements"));
    }
}
