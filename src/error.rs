//! Error types for the pdftools-client library.
//!
//! Two layers reflect two distinct moments of failure:
//!
//! * [`ValidationError`] — **Local, pre-flight**: the selection or the
//!   parameters are wrong (unsupported MIME type, oversized file, page range
//!   inverted). These are detected synchronously and never reach the network.
//!
//! * [`WorkflowError`] — **Everything a submission can end with**: a wrapped
//!   validation failure, a transport failure (no response), a non-2xx reply,
//!   or a 2xx reply whose payload is obviously not a result.
//!
//! Every error maps onto an [`ErrorKind`], the client-observable taxonomy the
//! workflow publishes through [`crate::status::WorkflowStatus::Error`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// A local, pre-flight failure. Reported immediately, never sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    // ── Selection errors ──────────────────────────────────────────────────
    /// A required file slot has no selection.
    #[error("No file selected for '{slot}'")]
    NoFileSelected { slot: String },

    /// The tool has no file slot with this field name.
    #[error("Unknown file slot '{slot}'")]
    UnknownSlot { slot: String },

    /// MIME type is not in the slot's accepted set.
    #[error("unsupported file type: '{name}' is {mime}")]
    UnsupportedFileType { name: String, mime: String },

    /// File exceeds the slot's byte ceiling.
    #[error("file too large: '{name}' is {size} bytes (limit {max} bytes)")]
    FileTooLarge { name: String, size: u64, max: u64 },

    /// Multi-file slot received fewer files than required.
    #[error("Please select at least {min} files for '{slot}' (got {got})")]
    TooFewFiles { slot: String, min: usize, got: usize },

    /// Slot received more files than it accepts.
    #[error("At most {max} files may be selected for '{slot}' (got {got})")]
    TooManyFiles { slot: String, max: usize, got: usize },

    // ── Parameter errors ──────────────────────────────────────────────────
    /// A required parameter was not supplied (or is blank).
    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: String },

    /// A parameter could not be parsed or is outside its bounds.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Page numbers are 1-indexed.
    #[error("Page numbers must be greater than zero")]
    PageZero,

    /// Page range with `from > to`.
    #[error("from must be ≤ to (got {from}-{to})")]
    InvalidPageRange { from: u32, to: u32 },

    /// Page number beyond the document's known page count.
    #[error("Page range exceeds PDF length ({total} pages, got page {page})")]
    PageOutOfRange { page: u32, total: u32 },

    /// Crop region is empty or inverted.
    #[error("Invalid crop area: {reason}")]
    InvalidCropBox { reason: String },

    /// None of a set of alternative parameters was supplied.
    #[error("One of {} is required", .fields.join(" or "))]
    MissingOneOf { fields: Vec<String> },
}

/// Every way a workflow operation can fail.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Local pre-flight failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ── Transport errors ──────────────────────────────────────────────────
    /// No response was received (connection refused, DNS, reset).
    #[error("no response from server: {reason}")]
    Network { reason: String },

    /// The request did not complete within the configured timeout.
    #[error("no response from server: timed out after {secs}s")]
    Timeout { secs: u64 },

    // ── Response errors ───────────────────────────────────────────────────
    /// Non-2xx reply. `message` is the server's own text when it sent one,
    /// otherwise a generic per-tool message embedding the status code.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx reply whose payload failed a sanity check.
    #[error("{message}")]
    Application { message: String },

    // ── Usage errors ──────────────────────────────────────────────────────
    /// A submission is already in flight; nothing was sent.
    #[error("A request is already in progress")]
    Busy,

    /// The submission was superseded by reset, re-selection or drop and its
    /// response was discarded.
    #[error("Request cancelled")]
    Cancelled,

    /// No tool is registered under this id.
    #[error("Unknown tool '{0}'. Run `pdftools list` to see available tools.")]
    UnknownTool(String),

    /// Config or tool-spec builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// An input file could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A download could not be written.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Client-observable error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Rejected locally before any request.
    Validation,
    /// No response from the backend.
    Network,
    /// Backend answered with a non-2xx status.
    Server,
    /// Backend answered 2xx but the payload is not a usable result.
    Application,
    /// Misuse of the API (busy, cancelled, bad config, unknown tool).
    Usage,
    /// Local file-system failure.
    Io,
}

impl WorkflowError {
    /// Classify this error into the client-observable taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Validation(_) => ErrorKind::Validation,
            WorkflowError::Network { .. } | WorkflowError::Timeout { .. } => ErrorKind::Network,
            WorkflowError::Server { .. } => ErrorKind::Server,
            WorkflowError::Application { .. } => ErrorKind::Application,
            WorkflowError::Busy
            | WorkflowError::Cancelled
            | WorkflowError::UnknownTool(_)
            | WorkflowError::InvalidConfig(_)
            | WorkflowError::Internal(_) => ErrorKind::Usage,
            WorkflowError::FileRead { .. } | WorkflowError::OutputWriteFailed { .. } => {
                ErrorKind::Io
            }
        }
    }

    /// HTTP status of a server error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            WorkflowError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
