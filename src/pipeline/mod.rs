//! Pipeline stages for PDF-to-dataset generation.
//!
//! Each submodule implements exactly one step. The three response stages
//! (`sanitize::normalize`, `sanitize::repair`, `validate`) are pure functions
//! over text and hold no state, so they are tested without any I/O.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ prompts ──▶ llm ──▶ normalize ──▶ repair ──▶ validate ──▶ dataset
//! (pdfium)    (policy)   (model)  (fences)     (commas)   (records)    (JSONL)
//! ```
//!
//! 1. [`extract`]: full document text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 2. [`llm`]: one generation call per document, the only stage with
//!    network I/O
//! 3. [`sanitize`]: strip wrapping artifacts, then fix the near-JSON
//!    mistakes models make (missing/trailing commas, stray backslashes)
//! 4. [`validate`]: parse and keep only well-formed question/answer objects

pub mod extract;
pub mod llm;
pub mod sanitize;
pub mod validate;

use crate::error::ResponseError;
use crate::record::QaRecord;

/// Run a raw model response through normalize → repair → validate.
pub fn records_from_response(raw: &str) -> Result<Vec<QaRecord>, ResponseError> {
    let normalized = sanitize::normalize(raw);
    let repaired = sanitize::repair(&normalized);
    validate::validate_records(&repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_response_with_model_mistakes() {
        let raw = "```json\n[\n  {\"question\": \"What is `Box<T>`?\", \"answer\": \"A heap pointer.\"}\n  {\"question\": \"Path?\", \"answer\": \"C:\\dir\\x\"},\n]\n```";
        let records = records_from_response(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].question, "What is `Box<T>`?");
        assert_eq!(records[1].answer, "C:\\dir\\x");
    }

    #[test]
    fn bare_objects_are_framed() {
        let raw = r#"{"question":"q1","answer":"a1"}{"question":"q2","answer":"a2"}"#;
        let records = records_from_response(raw).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn prose_only_response_is_malformed() {
        let err = records_from_response("Sorry, I cannot help with that.").unwrap_err();
        assert_eq!(err.kind(), "MalformedResponse");
    }
}
