//! Client configuration.
//!
//! Every knob that is shared across tools lives in [`ClientConfig`], built via
//! [`ClientConfigBuilder`]. Tool-specific settings (endpoint, accepted types,
//! per-tool timeout) live on [`crate::tool::ToolSpec`] instead.
//!
//! The only environment input is the backend base URL, read by
//! [`ClientConfig::from_env`] from `PDFTOOLS_API_URL`.

use crate::error::WorkflowError;
use serde::{Deserialize, Serialize};

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "PDFTOOLS_API_URL";

/// Base URL used when [`BASE_URL_ENV`] is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// 50 MiB, the upload ceiling most tools apply.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration shared by every workflow created from it.
///
/// # Example
/// ```rust
/// use pdftools_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://pdf-backend.internal:5000")
///     .timeout_secs(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.endpoint_url("/merge"), "http://pdf-backend.internal:5000/merge");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend base URL, without trailing slash. Default: `http://localhost:5000`.
    pub base_url: String,

    /// Whole-request timeout in seconds unless the tool overrides it. Default: 60.
    ///
    /// Conversions of large Office documents can take well over a minute;
    /// tools that are known to be slow carry their own override.
    pub timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Byte ceiling applied by catalog tools that do not set their own. Default: 50 MiB.
    pub default_max_file_bytes: u64,

    /// 2xx blob bodies shorter than this are inspected for an error marker.
    /// Default: 100.
    pub min_result_bytes: usize,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
            connect_timeout_secs: 10,
            default_max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            min_result_bytes: 100,
            user_agent: format!("pdftools-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults, with the base URL taken from `PDFTOOLS_API_URL` when set.
    pub fn from_env() -> Result<Self, WorkflowError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                builder = builder.base_url(url);
            }
        }
        builder.build()
    }

    /// Absolute URL for a tool endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn default_max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.default_max_file_bytes = bytes;
        self
    }

    pub fn min_result_bytes(mut self, bytes: usize) -> Self {
        self.config.min_result_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, WorkflowError> {
        let c = &self.config;
        let parsed = reqwest::Url::parse(&c.base_url).map_err(|e| {
            WorkflowError::InvalidConfig(format!("base URL '{}' is not a URL: {e}", c.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WorkflowError::InvalidConfig(format!(
                "base URL must be http or https, got '{}'",
                parsed.scheme()
            )));
        }
        if c.timeout_secs == 0 {
            return Err(WorkflowError::InvalidConfig(
                "Timeout must be ≥ 1 second".into(),
            ));
        }
        if c.default_max_file_bytes == 0 {
            return Err(WorkflowError::InvalidConfig(
                "File size ceiling must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}
