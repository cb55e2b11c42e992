//! Observer trait for workflow events.
//!
//! Inject an [`Arc<dyn WorkflowObserver>`] via
//! [`crate::workflow::FileTransformWorkflow::with_observer`] to receive events
//! as a submission progresses. The CLI uses it to drive its spinner; a GUI
//! would repaint the triggering control.
//!
//! For plain state tracking prefer
//! [`crate::workflow::FileTransformWorkflow::subscribe`]; the observer adds
//! the events a status value cannot express (upload size, discarded replies).
//!
//! # Example
//!
//! ```rust
//! use pdftools_client::{WorkflowObserver, WorkflowStatus};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Transitions(AtomicUsize);
//!
//! impl WorkflowObserver for Transitions {
//!     fn on_status_change(&self, _status: &WorkflowStatus) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//! ```

use crate::object_url::ObjectUrl;
use crate::status::WorkflowStatus;
use std::sync::Arc;

/// Called by the workflow as it moves through a submission.
///
/// Implementations must be `Send + Sync`: a reset can arrive from another task
/// while a submission is awaiting its response. All methods have default
/// no-op implementations so callers only override what they care about.
pub trait WorkflowObserver: Send + Sync {
    /// Called after every status change.
    fn on_status_change(&self, status: &WorkflowStatus) {
        let _ = status;
    }

    /// Called just before the request is sent.
    ///
    /// # Arguments
    /// * `tool`        — tool id
    /// * `file_count`  — number of file parts
    /// * `total_bytes` — summed size of all file parts
    fn on_upload_start(&self, tool: &str, file_count: usize, total_bytes: u64) {
        let _ = (tool, file_count, total_bytes);
    }

    /// Called when a result has been stored and is ready for download.
    fn on_result(&self, url: &ObjectUrl, filename: &str, size: usize) {
        let _ = (url, filename, size);
    }

    /// Called when a reply arrives for a submission that was superseded.
    fn on_discarded(&self, tool: &str) {
        let _ = tool;
    }
}

/// A no-op observer.
pub struct NoopObserver;

impl WorkflowObserver for NoopObserver {}

/// Convenience alias for the stored observer type.
pub type SharedObserver = Arc<dyn WorkflowObserver>;
