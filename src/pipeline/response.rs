//! Response classification.
//!
//! ## Why a separate stage?
//!
//! The backend is inconsistent about how it fails. Most routes answer a bad
//! request with `{"error": "..."}` and a 4xx/5xx, some use `message`, some
//! send plain text, and a few answer 200 with an error document or an empty
//! body. Every rule for telling a result from a failure lives here, applied
//! to a [`RawResponse`], so the rules are testable without a server and the
//! workflow only ever sees a result or a classified [`WorkflowError`].

use crate::error::WorkflowError;
use crate::pipeline::transport::RawResponse;
use crate::tool::{ResponseKind, ToolSpec};
use bytes::Bytes;
use serde_json::Value;

/// Plain-text error bodies longer than this are not shown verbatim.
const MAX_TEXT_ERROR_LEN: usize = 300;

/// A reply that passed classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub bytes: Bytes,
    pub mime: String,
    pub filename: String,
}

/// Turn a raw reply into a result or a classified error.
///
/// * `default_name` — download name used when the reply suggests none.
/// * `min_result_bytes` — blob bodies shorter than this are checked for an
///   error marker.
pub fn classify(
    raw: RawResponse,
    tool: &ToolSpec,
    default_name: &str,
    min_result_bytes: usize,
) -> Result<Classified, WorkflowError> {
    if !raw.is_success() {
        return Err(server_error(&raw, &tool.failure_message));
    }

    if raw.body.is_empty() {
        return Err(WorkflowError::Application {
            message: format!("{} The server returned an empty response.", tool.failure_message),
        });
    }

    let served_mime = raw
        .content_type
        .as_deref()
        .map(essence)
        .filter(|m| !m.is_empty() && *m != crate::file::OCTET_STREAM);

    match &tool.response {
        ResponseKind::Json => check_json_report(&raw.body, tool)?,
        ResponseKind::Blob { mime } => {
            let json_where_blob_expected =
                served_mime == Some("application/json") && mime != "application/json";
            if json_where_blob_expected {
                return Err(WorkflowError::Application {
                    message: json_field(&raw.body, &["error", "message"]).unwrap_or_else(|| {
                        format!("{} The server returned an error.", tool.failure_message)
                    }),
                });
            }
            if raw.body.len() < min_result_bytes && looks_like_error(&raw.body) {
                return Err(WorkflowError::Application {
                    message: json_field(&raw.body, &["error", "message"]).unwrap_or_else(|| {
                        format!("{} The server returned an error.", tool.failure_message)
                    }),
                });
            }
        }
        ResponseKind::Text => {}
    }

    let mime = served_mime
        .map(str::to_string)
        .unwrap_or_else(|| tool.response.default_mime().to_string());
    let filename = raw
        .content_disposition
        .as_deref()
        .and_then(disposition_filename)
        .unwrap_or_else(|| default_name.to_string());

    Ok(Classified {
        bytes: raw.body,
        mime,
        filename,
    })
}

/// Classify a non-2xx reply.
///
/// The body's own `message`/`error` text wins; otherwise `failure_message` is
/// suffixed with the status code.
pub fn server_error(raw: &RawResponse, failure_message: &str) -> WorkflowError {
    let message = server_message(raw)
        .unwrap_or_else(|| format!("{failure_message} Server error ({}).", raw.status));
    WorkflowError::Server {
        status: raw.status,
        message,
    }
}

/// Error text carried by a non-2xx body, if any.
fn server_message(raw: &RawResponse) -> Option<String> {
    if let Some(msg) = json_field(&raw.body, &["message", "error"]) {
        return Some(msg);
    }
    let is_plain = raw
        .content_type
        .as_deref()
        .map(|ct| essence(ct) == "text/plain")
        .unwrap_or(false);
    if is_plain {
        let text = String::from_utf8_lossy(&raw.body).trim().to_string();
        if !text.is_empty() && text.len() <= MAX_TEXT_ERROR_LEN {
            return Some(text);
        }
    }
    None
}

/// First non-empty string among `keys` in a JSON object body.
fn json_field(body: &[u8], keys: &[&str]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn check_json_report(body: &[u8], tool: &ToolSpec) -> Result<(), WorkflowError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| WorkflowError::Application {
        message: format!("{} The server returned malformed JSON: {e}", tool.failure_message),
    })?;
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(WorkflowError::Application {
            message: json_field(body, &["error", "message"])
                .unwrap_or_else(|| tool.failure_message.clone()),
        });
    }
    Ok(())
}

fn looks_like_error(body: &[u8]) -> bool {
    String::from_utf8_lossy(body).to_ascii_lowercase().contains("error")
}

/// `text/html; charset=utf-8` → `text/html`
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// Filename from a `Content-Disposition` header.
///
/// Prefers the RFC 5987 `filename*=` form, falling back to `filename=` when
/// the extended value does not decode to UTF-8. Any directory part is stripped.
pub fn disposition_filename(header: &str) -> Option<String> {
    let params: Vec<&str> = header.split(';').map(str::trim).collect();

    let extended = params.iter().find_map(|p| {
        let (key, value) = p.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename*") {
            return None;
        }
        // charset'lang'percent-encoded
        let encoded = value.trim().splitn(3, '\'').nth(2)?;
        urlencoding::decode(encoded).ok().map(|d| d.into_owned())
    });

    let plain = || {
        params.iter().find_map(|p| {
            let (key, value) = p.split_once('=')?;
            if !key.trim().eq_ignore_ascii_case("filename") {
                return None;
            }
            Some(value.trim().trim_matches('"').to_string())
        })
    };

    let name = extended.or_else(plain)?;
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base)
    }
}
