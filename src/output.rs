//! Result types returned by the generation pipeline.

use crate::error::DocumentError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of processing one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// File name of the document (no folder).
    pub document: String,

    /// 0-based position in sorted file order.
    pub index: usize,

    /// Records appended to the dataset for this document.
    pub records: usize,

    /// Wall-clock time spent on this document, in milliseconds.
    pub duration_ms: u64,

    /// Prompt tokens reported by the provider (0 if unknown).
    pub input_tokens: u64,

    /// Completion tokens reported by the provider (0 if unknown).
    pub output_tokens: u64,

    /// Why the document produced no records. `None` on success.
    pub error: Option<DocumentError>,
}

impl DocumentReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate numbers for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// PDF files found in the data folder.
    pub total_documents: usize,

    /// Documents processed without a per-document error.
    pub succeeded_documents: usize,

    /// Documents that failed at some stage and contributed nothing.
    pub failed_documents: usize,

    /// Records appended during this run.
    pub records_written: usize,

    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

/// State of the dataset file after the run, including records from
/// earlier runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Non-empty lines in the dataset file.
    pub total_records: usize,

    /// Size of the dataset file in bytes.
    pub file_size_bytes: u64,
}

impl DatasetSummary {
    /// File size in mebibytes, as shown in the end-of-run summary.
    pub fn file_size_mb(&self) -> f64 {
        self.file_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Everything a run produces besides the dataset lines themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    /// The dataset file records were appended to.
    pub output_path: PathBuf,

    /// One report per document, in sorted file order.
    pub documents: Vec<DocumentReport>,

    pub stats: RunStats,

    pub summary: DatasetSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_size_mb_uses_binary_megabytes() {
        let summary = DatasetSummary {
            total_records: 1,
            file_size_bytes: 3 * 1024 * 1024 / 2,
        };
        assert!((summary.file_size_mb() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn report_serialises_error_kind() {
        let report = DocumentReport {
            document: "a.pdf".into(),
            index: 0,
            records: 0,
            duration_ms: 12,
            input_tokens: 0,
            output_tokens: 0,
            error: Some(DocumentError::Generation {
                detail: "401".into(),
            }),
        };
        assert!(!report.succeeded());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"Generation\""), "{json}");
    }
}
