//! Auxiliary backend endpoints.
//!
//! Neither call produces a downloadable artefact, so they bypass the workflow
//! state machine: `/page-count` feeds page-range validation and `/health` is a
//! readiness probe. [`ComparisonReport`] is the typed body of the `compare`
//! tool's JSON result.

use crate::error::WorkflowError;
use crate::file::SelectedFile;
use crate::pipeline::request::TransformRequest;
use crate::pipeline::response::server_error;
use crate::pipeline::transport::{RawResponse, Transport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Body of `GET /health`.
///
/// The backend answers 500 when a check fails but still sends this body, so a
/// degraded report is returned as a value rather than an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub checks: BTreeMap<String, bool>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }

    /// Names of checks that did not pass.
    pub fn failing_checks(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Result body of the `compare` tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub file1_pages: u32,
    pub file2_pages: u32,
    /// Unified-diff lines, truncated by the server.
    #[serde(default)]
    pub differences: Vec<String>,
    /// Text similarity in percent.
    pub similarity: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageCountReply {
    page_count: u32,
}

/// Ask the backend how many pages `file` has.
pub async fn page_count(transport: &Transport, file: &SelectedFile) -> Result<u32, WorkflowError> {
    let mut request = TransformRequest::new("/page-count");
    request.parts.push(("file".to_string(), file.clone()));

    let timeout = transport.config().timeout_secs;
    let raw = transport
        .post_multipart(&request, timeout, &CancellationToken::new())
        .await?;
    if !raw.is_success() {
        return Err(server_error(&raw, "Could not read the page count."));
    }
    let reply: PageCountReply = parse_json(&raw, "page count")?;
    debug!("{} has {} pages", file.name(), reply.page_count);
    Ok(reply.page_count)
}

/// Probe `GET /health`.
pub async fn health(transport: &Transport) -> Result<HealthReport, WorkflowError> {
    let raw = transport.get("/health", transport.config().timeout_secs).await?;
    match parse_json::<HealthReport>(&raw, "health report") {
        Ok(report) => Ok(report),
        Err(_) if !raw.is_success() => Err(server_error(&raw, "Health check failed.")),
        Err(e) => Err(e),
    }
}

fn parse_json<T: for<'de> Deserialize<'de>>(raw: &RawResponse, what: &str) -> Result<T, WorkflowError> {
    serde_json::from_slice(&raw.body).map_err(|e| WorkflowError::Application {
        message: format!("Malformed {what} from server: {e}"),
    })
}
