//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch.
//!
//! # Example
//!
//! ```rust
//! use doc2json::{BatchEntry, BatchProgressCallback, ExtractionConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl BatchProgressCallback for Printer {
//!     fn on_document_complete(&self, completed: usize, total: usize, entry: &BatchEntry) {
//!         eprintln!("{completed}/{total} {}", entry.filename);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BatchEntry;
use std::sync::Arc;

/// Called by the orchestrator as it processes each document of a batch.
///
/// Documents are processed one at a time, so events arrive in order. All
/// methods have no-op defaults.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first document.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a document is rendered.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position in the batch
    /// * `total`: batch size
    /// * `filename`: display name of the document
    fn on_document_start(&self, index: usize, total: usize, filename: &str) {
        let _ = (index, total, filename);
    }

    /// Called after a document reached an outcome, success or failure.
    ///
    /// `completed` is the cumulative count including this document.
    fn on_document_complete(&self, completed: usize, total: usize, entry: &BatchEntry) {
        let _ = (completed, total, entry);
    }

    /// Called once after every document has been attempted.
    fn on_batch_complete(&self, total: usize, succeeded: usize) {
        let _ = (total, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ExtractionResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Tracking {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        progress: Mutex<Vec<(usize, usize)>>,
        succeeded: AtomicUsize,
    }

    impl BatchProgressCallback for Tracking {
        fn on_batch_start(&self, total: usize) {
            self.started_total.store(total, Ordering::SeqCst);
        }

        fn on_document_start(&self, _index: usize, _total: usize, _filename: &str) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_document_complete(&self, completed: usize, total: usize, _entry: &BatchEntry) {
            self.progress.lock().unwrap().push((completed, total));
        }

        fn on_batch_complete(&self, _total: usize, succeeded: usize) {
            self.succeeded.store(succeeded, Ordering::SeqCst);
        }
    }

    fn entry(name: &str) -> BatchEntry {
        BatchEntry {
            filename: name.into(),
            result: ExtractionResult::Success(serde_json::json!({})),
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_document_start(1, 2, "a.pdf");
        cb.on_document_complete(1, 2, &entry("a.pdf"));
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = Tracking::default();
        t.on_batch_start(2);
        t.on_document_start(1, 2, "a.pdf");
        t.on_document_complete(1, 2, &entry("a.pdf"));
        t.on_document_start(2, 2, "b.pdf");
        t.on_document_complete(2, 2, &entry("b.pdf"));
        t.on_batch_complete(2, 2);

        assert_eq!(t.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(t.starts.load(Ordering::SeqCst), 2);
        assert_eq!(*t.progress.lock().unwrap(), vec![(1, 2), (2, 2)]);
        assert_eq!(t.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(3);
        cb.on_document_complete(1, 3, &entry("x.pdf"));
    }
}
