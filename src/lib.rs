//! # pdftools-client
//!
//! Client for a PDF utility backend (merge, split, compress, convert, sign,
//! redact, OCR, …) reached over HTTP.
//!
//! ## Why this crate?
//!
//! Every tool of the backend follows the same cycle: pick one or more files,
//! fill in a few parameters, post them as `multipart/form-data`, and offer the
//! returned blob as a download. Instead of one controller per tool, this crate
//! has a single [`FileTransformWorkflow`] configured by a [`ToolSpec`]; the
//! [`catalog`] holds the concrete tools.
//!
//! ## Submission Overview
//!
//! ```text
//! select_file(s)
//!  │
//!  ├─ 1. Validate  MIME type, size ceiling, file count (synchronous)
//!  ├─ 2. Resolve   parameter schema → form fields (page ranges, crop box, …)
//!  ├─ 3. Request   multipart body, one part per selected file
//!  ├─ 4. Transport reqwest POST with timeout + cancellation token
//!  ├─ 5. Classify  server message / sanity checks / download filename
//!  └─ 6. Result    blob behind a revocable ObjectUrl, status → Success
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdftools_client::{catalog, ClientConfig, FileTransformWorkflow, Parameters, SelectedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Base URL from PDFTOOLS_API_URL, default http://localhost:5000
//!     let config = ClientConfig::from_env()?;
//!     let tool = catalog::find("split", &config)?;
//!     let workflow = FileTransformWorkflow::from_config(tool, config)?;
//!
//!     workflow.select_file(SelectedFile::from_path("report.pdf").await?)?;
//!     workflow.fetch_page_count().await?;
//!     let download = workflow.submit(&Parameters::new().page_range(2, 5)).await?;
//!     download.save_to(".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftools` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdftools-client = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod file;
pub mod object_url;
pub mod params;
pub mod pipeline;
pub mod preferences;
pub mod progress;
pub mod status;
pub mod tool;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use backend::{ComparisonReport, HealthReport};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{ErrorKind, ValidationError, WorkflowError};
pub use file::{FileConstraints, SelectedFile};
pub use object_url::{Blob, ObjectUrl, ObjectUrlStore};
pub use params::{CropBox, PageRange, ParamKind, ParamSpec, ParamValue, Parameters};
pub use pipeline::transport::Transport;
pub use preferences::{PreferenceStore, Theme};
pub use progress::{NoopObserver, SharedObserver, WorkflowObserver};
pub use status::{StatusError, WorkflowStatus};
pub use tool::{FileSlot, ResponseKind, ToolSpec, ToolSpecBuilder};
pub use workflow::{Download, FileTransformWorkflow, TransformResult};
