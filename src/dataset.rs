//! Line-delimited dataset sink.
//!
//! Every run appends to the same file, so re-running over a growing data
//! folder accumulates records. One document's records are written with a
//! single `write_all` while holding the sink's lock: when several documents
//! are in flight their lines never interleave.

use crate::output::DatasetSummary;
use crate::record::QaRecord;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// Append-only JSONL writer for [`QaRecord`]s in conversation form.
#[derive(Debug)]
pub struct DatasetSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DatasetSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records` as one line each, in order. Returns the number of
    /// lines written. The file and its parent folder are created on demand;
    /// existing content is never touched.
    pub async fn append(&self, records: &[QaRecord]) -> io::Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut buf = String::new();
        for record in records {
            buf.push_str(&record.to_conversation().to_line());
            buf.push('\n');
        }

        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        debug!("Appended {} lines to {}", records.len(), self.path.display());
        Ok(records.len())
    }

    /// Count the records in the file and report its size. A file that does
    /// not exist yet is an empty dataset.
    pub async fn summary(&self) -> io::Result<DatasetSummary> {
        let _guard = self.lock.lock().await;

        // Bytes, not text: a foreign non-UTF-8 line must not fail the run.
        let content = match tokio::fs::read(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(DatasetSummary::default());
            }
            Err(e) => return Err(e),
        };

        Ok(DatasetSummary {
            total_records: content
                .split(|&b| b == b'\n')
                .filter(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
                .count(),
            file_size_bytes: content.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ConversationRecord;

    fn rec(q: &str, a: &str) -> QaRecord {
        QaRecord::new(q, a)
    }

    #[tokio::test]
    async fn append_preserves_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.jsonl");
        std::fs::write(&path, "{\"existing\":true}\n").unwrap();

        let sink = DatasetSink::new(&path);
        let n = sink.append(&[rec("q1", "a1"), rec("q2", "a2")]).await.unwrap();
        assert_eq!(n, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "{\"existing\":true}");

        let second: ConversationRecord = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(second.to_qa().unwrap(), rec("q2", "a2"));
    }

    #[tokio::test]
    async fn append_creates_parent_folder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("d.jsonl");
        let sink = DatasetSink::new(&path);
        sink.append(&[rec("q", "a")]).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn empty_append_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.jsonl");
        let sink = DatasetSink::new(&path);
        assert_eq!(sink.append(&[]).await.unwrap(), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn summary_counts_lines_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.jsonl");
        let sink = DatasetSink::new(&path);

        assert_eq!(sink.summary().await.unwrap(), DatasetSummary::default());

        sink.append(&[rec("q1", "a1")]).await.unwrap();
        sink.append(&[rec("q2", "a2"), rec("q3", "a3")]).await.unwrap();

        let summary = sink.summary().await.unwrap();
        assert_eq!(summary.total_records, 3);
        assert_eq!(
            summary.file_size_bytes,
            std::fs::metadata(&path).unwrap().len()
        );
    }

    #[tokio::test]
    async fn summary_tolerates_non_utf8_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("d.jsonl");
        std::fs::write(&path, b"{\"legacy\":\"\xff\xfe\"}\n\n").unwrap();

        let sink = DatasetSink::new(&path);
        sink.append(&[rec("q", "a")]).await.unwrap();

        let summary = sink.summary().await.unwrap();
        assert_eq!(summary.total_records, 2);
        assert_eq!(
            summary.file_size_bytes,
            std::fs::metadata(&path).unwrap().len()
        );
    }
}
