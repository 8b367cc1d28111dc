//! Progress-callback trait for per-document generation events.
//!
//! Inject an [`Arc<dyn DatasetProgressCallback>`] via
//! [`crate::config::DatasetConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through the data folder. Every document
//! attempted produces exactly one `on_document_complete` or
//! `on_document_error`, so a progress bar ticked from those two methods always
//! reaches its end.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2qa::{DatasetConfig, DatasetProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RecordCounter {
//!     records: AtomicUsize,
//! }
//!
//! impl DatasetProgressCallback for RecordCounter {
//!     fn on_document_complete(&self, name: &str, _index: usize, _total: usize, records: usize) {
//!         self.records.fetch_add(records, Ordering::SeqCst);
//!         eprintln!("{name}: {records} pairs");
//!     }
//! }
//!
//! let counter = Arc::new(RecordCounter { records: AtomicUsize::new(0) });
//!
//! let config = DatasetConfig::builder()
//!     .progress_callback(counter as Arc<dyn DatasetProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline as it processes each document.
///
/// Implementations must be `Send + Sync`: with `concurrency > 1` the
/// per-document methods may be called from interleaved futures. All methods
/// default to no-ops.
pub trait DatasetProgressCallback: Send + Sync {
    /// Called once, after the data folder has been listed.
    fn on_run_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called before text extraction starts for a document.
    ///
    /// `index` is 0-based in sorted file order.
    fn on_document_start(&self, name: &str, index: usize, total: usize) {
        let _ = (name, index, total);
    }

    /// Called when a document produced records that were written.
    fn on_document_complete(&self, name: &str, index: usize, total: usize, records: usize) {
        let _ = (name, index, total, records);
    }

    /// Called when a document yielded no records, with the reason.
    ///
    /// `kind` is the stable error name (`ExtractionError`, `GenerationError`,
    /// `MalformedResponse`, …). `error` is the full message; for a parse
    /// failure its second line holds the text around the error offset.
    fn on_document_error(&self, name: &str, index: usize, total: usize, kind: &str, error: &str) {
        let _ = (name, index, total, kind, error);
    }

    /// Called once after every document has been attempted.
    fn on_run_complete(&self, total_documents: usize, succeeded: usize) {
        let _ = (total_documents, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl DatasetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::DatasetConfig`].
pub type ProgressCallback = Arc<dyn DatasetProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        records: AtomicUsize,
    }

    impl DatasetProgressCallback for TrackingCallback {
        fn on_document_start(&self, _name: &str, _index: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, _name: &str, _index: usize, _total: usize, records: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.records.fetch_add(records, Ordering::SeqCst);
        }

        fn on_document_error(
            &self,
            _name: &str,
            _index: usize,
            _total: usize,
            _kind: &str,
            _error: &str,
        ) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_document_start("a.pdf", 0, 2);
        cb.on_document_complete("a.pdf", 0, 2, 20);
        cb.on_document_error("b.pdf", 1, 2, "GenerationError", "generation failed: 401");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_document_start("a.pdf", 0, 2);
        tracker.on_document_complete("a.pdf", 0, 2, 12);
        tracker.on_document_start("b.pdf", 1, 2);
        tracker.on_document_error("b.pdf", 1, 2, "NoValidRecords", "no valid records");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.records.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(1);
        cb.on_document_complete("doc.pdf", 0, 1, 3);
    }
}
