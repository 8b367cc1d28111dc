//! Record validation: parse repaired text and keep well-formed pairs.
//!
//! A model that emits a handful of broken entries among twenty good ones is
//! normal, so individual bad elements are dropped quietly. Only whole-response
//! problems become a [`ResponseError`]: text that still does not parse, JSON
//! that is not an array, or an array with nothing usable in it.

use crate::error::ResponseError;
use crate::record::QaRecord;
use serde_json::Value;
use tracing::{debug, warn};

/// Bytes of context kept on each side of a parse error.
const CONTEXT_RADIUS: usize = 50;

/// Parse `text` and return the valid records in their original order.
///
/// An element is kept when it is an object whose `question` and `answer`
/// keys both hold non-blank strings; extra keys are ignored. `[]` is a valid
/// response with zero records, not an error.
pub fn validate_records(text: &str) -> Result<Vec<QaRecord>, ResponseError> {
    let value: Value = serde_json::from_str(text).map_err(|e| malformed(text, &e))?;

    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(ResponseError::UnexpectedShape {
                found: json_type_name(&other).to_string(),
            })
        }
    };

    let total = items.len();
    let records: Vec<QaRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let record = to_record(item);
            if record.is_none() {
                debug!("Dropping element {}: not a question/answer record", i);
            }
            record
        })
        .collect();

    if records.is_empty() && total > 0 {
        return Err(ResponseError::NoValidRecords { total });
    }
    if records.len() < total {
        debug!("Kept {}/{} elements", records.len(), total);
    }
    Ok(records)
}

/// Total form of [`validate_records`]: failures are logged and yield no records.
pub fn validate(text: &str) -> Vec<QaRecord> {
    validate_records(text).unwrap_or_else(|e| {
        warn!("{}: {}", e.kind(), e);
        Vec::new()
    })
}

/// One array element as a record. Both `question` and `answer` must be
/// strings with at least one non-whitespace character; a whitespace-only
/// value drops the element. Other keys are ignored.
fn to_record(item: Value) -> Option<QaRecord> {
    let Value::Object(mut map) = item else {
        return None;
    };
    let Value::String(question) = map.remove("question")? else {
        return None;
    };
    let Value::String(answer) = map.remove("answer")? else {
        return None;
    };
    if question.trim().is_empty() || answer.trim().is_empty() {
        return None;
    }
    Some(QaRecord::new(question, answer))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn malformed(text: &str, err: &serde_json::Error) -> ResponseError {
    let offset = byte_offset(text, err.line(), err.column());
    ResponseError::Malformed {
        offset,
        line: err.line(),
        column: err.column(),
        message: err.to_string(),
        context: context_window(text, offset, CONTEXT_RADIUS).to_string(),
    }
}

/// Convert serde_json's 1-based line / byte-column into a byte offset.
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len())
}

/// Up to `radius` bytes either side of `offset`, widened to char boundaries.
fn context_window(text: &str, offset: usize, radius: usize) -> &str {
    let mut start = offset.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = offset.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_mixed_elements() {
        let text = r#"[{"question":"q1","answer":"a1"},{"question":"q2"},"not a record",{"question":5,"answer":"a3"}]"#;
        let records = validate_records(text).unwrap();
        assert_eq!(records, vec![QaRecord::new("q1", "a1")]);
    }

    #[test]
    fn test_empty_array_is_not_an_error() {
        assert_eq!(validate_records("[]").unwrap(), vec![]);
    }

    #[test]
    fn test_order_preserved_and_duplicates_kept() {
        let text = r#"[{"question":"3","answer":"c"},{"question":"1","answer":"a"},{"question":"3","answer":"c"}]"#;
        let qs: Vec<String> = validate_records(text)
            .unwrap()
            .into_iter()
            .map(|r| r.question)
            .collect();
        assert_eq!(qs, vec!["3", "1", "3"]);
    }

    #[test]
    fn test_extra_keys_ignored_blank_values_dropped() {
        let text = r#"[{"question":"q","answer":"a","topic":"x"},{"question":"  ","answer":"a"},{"question":"q2","answer":"\n\t "},{"question":"q","answer":null}]"#;
        let records = validate_records(text).unwrap();
        assert_eq!(records, vec![QaRecord::new("q", "a")]);
    }

    #[test]
    fn test_no_valid_records_distinct_from_malformed() {
        let err = validate_records(r#"[1, "two", {"q": "x"}]"#).unwrap_err();
        assert_eq!(err, ResponseError::NoValidRecords { total: 3 });
        assert_eq!(err.kind(), "NoValidRecords");
    }

    #[test]
    fn test_unexpected_shape() {
        let err = validate_records(r#"{"question":"q","answer":"a"}"#).unwrap_err();
        assert_eq!(
            err,
            ResponseError::UnexpectedShape {
                found: "object".into()
            }
        );
    }

    #[test]
    fn test_malformed_reports_offset_and_context() {
        let text = "[{\"question\":\"q\",\n\"answer\": oops}]";
        match validate_records(text).unwrap_err() {
            ResponseError::Malformed {
                offset,
                line,
                context,
                ..
            } => {
                assert_eq!(line, 2);
                assert!(offset > 18 && offset < text.len(), "offset {offset}");
                assert!(context.contains("oops"), "context {context:?}");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_validate_total_form_returns_empty_on_error() {
        assert!(validate("not json at all").is_empty());
        assert_eq!(validate(r#"[{"question":"q","answer":"a"}]"#).len(), 1);
    }

    #[test]
    fn test_byte_offset_multiline() {
        let text = "ab\ncd\nef";
        assert_eq!(byte_offset(text, 1, 1), 0);
        assert_eq!(byte_offset(text, 2, 2), 4);
        assert_eq!(byte_offset(text, 3, 1), 6);
        assert_eq!(byte_offset(text, 9, 9), text.len());
    }

    #[test]
    fn test_context_window_char_boundaries() {
        let text = "ééééé";
        let w = context_window(text, 3, 1);
        assert!(!w.is_empty());
        assert!(text.contains(w));
        assert_eq!(context_window("abc", 10, 2), "");
    }
}
