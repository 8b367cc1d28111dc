//! Question/answer records and their persisted conversation form.
//!
//! A [`QaRecord`] is what the validator hands out; a [`ConversationRecord`]
//! is what lands on disk, one per line:
//!
//! ```text
//! {"conversations":[{"from":"human","value":"…"},{"from":"gpt","value":"…"}]}
//! ```

use serde::{Deserialize, Serialize};

/// One question paired with one answer.
///
/// Only [`crate::pipeline::validate`] constructs these from model output, so
/// both fields are always non-blank text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
}

impl QaRecord {
    pub(crate) fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }

    /// Convert into the two-turn persisted form.
    pub fn to_conversation(&self) -> ConversationRecord {
        ConversationRecord::from(self.clone())
    }
}

/// Who is speaking in a [`Turn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "human")]
    Human,
    #[serde(rename = "gpt")]
    Assistant,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub from: Speaker,
    pub value: String,
}

/// The persisted form of a [`QaRecord`]: human question, then assistant answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub conversations: Vec<Turn>,
}

impl From<QaRecord> for ConversationRecord {
    fn from(record: QaRecord) -> Self {
        Self {
            conversations: vec![
                Turn {
                    from: Speaker::Human,
                    value: record.question,
                },
                Turn {
                    from: Speaker::Assistant,
                    value: record.answer,
                },
            ],
        }
    }
}

impl ConversationRecord {
    /// Serialise as a single JSON line (no trailing newline).
    pub fn to_line(&self) -> String {
        // Only strings and fixed enum tags inside; serialisation cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Recover the question/answer pair, if the turns have the expected shape.
    pub fn to_qa(&self) -> Option<QaRecord> {
        match self.conversations.as_slice() {
            [q, a] if q.from == Speaker::Human && a.from == Speaker::Assistant => {
                Some(QaRecord::new(q.value.clone(), a.value.clone()))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_has_wire_shape() {
        let line = QaRecord::new("What is a borrow?", "A reference.")
            .to_conversation()
            .to_line();
        assert_eq!(
            line,
            r#"{"conversations":[{"from":"human","value":"What is a borrow?"},{"from":"gpt","value":"A reference."}]}"#
        );
    }

    #[test]
    fn line_round_trips_exact_text() {
        let original = QaRecord::new(
            "How do I print \"hi\"?",
            "Use:\n```rust\nprintln!(\"hi\\n\");\n```\nThat's it — ünïcödé too.\t",
        );
        let line = original.to_conversation().to_line();
        assert!(!line.contains('\n'), "a record must occupy exactly one line");

        let parsed: ConversationRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.to_qa(), Some(original));
    }

    #[test]
    fn wrong_turn_order_is_rejected() {
        let conv = ConversationRecord {
            conversations: vec![
                Turn {
                    from: Speaker::Assistant,
                    value: "a".into(),
                },
                Turn {
                    from: Speaker::Human,
                    value: "q".into(),
                },
            ],
        };
        assert_eq!(conv.to_qa(), None);
    }
}
