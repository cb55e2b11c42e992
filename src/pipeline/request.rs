//! Multipart request assembly.

use crate::error::WorkflowError;
use crate::file::SelectedFile;
use reqwest::multipart::{Form, Part};

/// An upload, ready to send. Exists only for the duration of one call.
#[derive(Debug, Clone)]
pub struct TransformRequest {
    pub endpoint: String,
    /// `(field, file)` in send order. Multi-file slots repeat the field name.
    pub parts: Vec<(String, SelectedFile)>,
    /// `(field, text)` scalar fields.
    pub fields: Vec<(String, String)>,
    /// Field names whose values must not be logged.
    pub secret_fields: Vec<String>,
}

impl TransformRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            parts: Vec::new(),
            fields: Vec::new(),
            secret_fields: Vec::new(),
        }
    }

    pub fn file_count(&self) -> usize {
        self.parts.len()
    }

    pub fn total_bytes(&self) -> u64 {
        self.parts.iter().map(|(_, f)| f.size()).sum()
    }

    /// Field names of the file parts, in order.
    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|(field, _)| field.as_str()).collect()
    }

    /// One-line summary for logs, with secret values masked.
    pub fn describe(&self) -> String {
        let files: Vec<String> = self
            .parts
            .iter()
            .map(|(field, f)| format!("{field}={} ({} bytes)", f.name(), f.size()))
            .collect();
        let fields: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| {
                if self.secret_fields.iter().any(|s| s == k) {
                    format!("{k}=***")
                } else {
                    format!("{k}={v}")
                }
            })
            .collect();
        format!(
            "POST {} files[{}] fields[{}]",
            self.endpoint,
            files.join(", "),
            fields.join(", ")
        )
    }

    /// Build the reqwest multipart body.
    pub fn to_form(&self) -> Result<Form, WorkflowError> {
        let mut form = Form::new();
        for (field, file) in &self.parts {
            // Shares the selection's buffer instead of copying it.
            let body = reqwest::Body::from(file.bytes().clone());
            let part = Part::stream_with_length(body, file.size())
                .file_name(file.name().to_string())
                .mime_str(file.mime())
                .map_err(|e| {
                    WorkflowError::Internal(format!(
                        "invalid MIME type '{}' for '{}': {e}",
                        file.mime(),
                        file.name()
                    ))
                })?;
            form = form.part(field.clone(), part);
        }
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}
