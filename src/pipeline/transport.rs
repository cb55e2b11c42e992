//! HTTP transport.
//!
//! A thin wrapper over one shared `reqwest::Client`. Every call reads the
//! whole body into memory: results are handed to the caller as a single blob
//! anyway, and the backend never streams.
//!
//! Cancellation is cooperative: [`Transport::post_multipart`] races the request
//! against a [`CancellationToken`]; when the token fires first the reqwest
//! future is dropped, which aborts the connection.

use crate::config::ClientConfig;
use crate::error::WorkflowError;
use crate::pipeline::request::TransformRequest;
use bytes::Bytes;
use reqwest::header::{HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything the classifier needs from a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Bytes,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Shared HTTP client bound to one [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    config: Arc<ClientConfig>,
}

impl Transport {
    pub fn new(config: ClientConfig) -> Result<Self, WorkflowError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| WorkflowError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// POST `request` as `multipart/form-data`.
    ///
    /// Returns `Err(Cancelled)` if `cancel` fires before the reply is read.
    pub async fn post_multipart(
        &self,
        request: &TransformRequest,
        timeout_secs: u64,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, WorkflowError> {
        let url = self.config.endpoint_url(&request.endpoint);
        let form = request.to_form()?;
        let send = async {
            let response = self
                .http
                .post(&url)
                .multipart(form)
                .timeout(Duration::from_secs(timeout_secs))
                .send()
                .await
                .map_err(|e| transport_error(e, timeout_secs))?;
            read_response(response, timeout_secs).await
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("POST {} cancelled", url);
                Err(WorkflowError::Cancelled)
            }
            result = send => result,
        }
    }

    /// GET `endpoint`.
    pub async fn get(&self, endpoint: &str, timeout_secs: u64) -> Result<RawResponse, WorkflowError> {
        let url = self.config.endpoint_url(endpoint);
        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(timeout_secs))
            .send()
            .await
            .map_err(|e| transport_error(e, timeout_secs))?;
        read_response(response, timeout_secs).await
    }
}

async fn read_response(response: reqwest::Response, timeout_secs: u64) -> Result<RawResponse, WorkflowError> {
    let status = response.status().as_u16();
    let header = |name: HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let content_type = header(CONTENT_TYPE);
    let content_disposition = header(CONTENT_DISPOSITION);
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(e, timeout_secs))?;
    debug!("HTTP {} ({} bytes, {:?})", status, body.len(), content_type);
    Ok(RawResponse {
        status,
        content_type,
        content_disposition,
        body,
    })
}

fn transport_error(e: reqwest::Error, timeout_secs: u64) -> WorkflowError {
    if e.is_timeout() {
        WorkflowError::Timeout { secs: timeout_secs }
    } else {
        WorkflowError::Network {
            reason: e.to_string(),
        }
    }
}
