//! Tool descriptions.
//!
//! Tools differ from one another only in constants, so those constants are
//! data: a [`ToolSpec`] names the endpoint, the multipart file slots and
//! their constraints, the parameter schema, and what kind of body comes back.
//! One [`crate::workflow::FileTransformWorkflow`] runs any of them.

use crate::error::WorkflowError;
use crate::file::FileConstraints;
use crate::params::ParamSpec;
use std::collections::HashSet;

/// A multipart field that carries one or more files.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSlot {
    /// Form field name, e.g. `file`, `files`, `watermark`, `cert`.
    pub field: String,
    /// Human label used in prompts and error messages.
    pub label: String,
    pub constraints: FileConstraints,
    /// Optional slots may stay empty (e.g. the certificate for signing).
    pub required: bool,
}

impl FileSlot {
    pub fn new(field: impl Into<String>, label: impl Into<String>, constraints: FileConstraints) -> Self {
        Self {
            field: field.into(),
            label: label.into(),
            constraints,
            required: true,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// What a successful response body is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseKind {
    /// Opaque binary artefact of the given MIME type (PDF, DOCX, ZIP, …).
    Blob { mime: String },
    /// Plain text (OCR output).
    Text,
    /// JSON document (comparison report).
    Json,
}

impl ResponseKind {
    pub fn blob(mime: impl Into<String>) -> Self {
        ResponseKind::Blob { mime: mime.into() }
    }

    /// MIME type recorded on the result when the server sends none.
    pub fn default_mime(&self) -> &str {
        match self {
            ResponseKind::Blob { mime } => mime,
            ResponseKind::Text => "text/plain",
            ResponseKind::Json => "application/json",
        }
    }
}

/// Full description of one tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSpec {
    /// Short identifier, e.g. `merge`.
    pub id: String,
    /// Display name, e.g. `Merge PDF`.
    pub label: String,
    /// Path relative to the base URL, e.g. `/merge`.
    pub endpoint: String,
    pub slots: Vec<FileSlot>,
    pub params: Vec<ParamSpec>,
    /// Groups of parameters of which at least one must be supplied.
    pub one_of: Vec<Vec<String>>,
    pub response: ResponseKind,
    /// Suggested download name. `{stem}` is replaced by the primary input's
    /// stem and `{<field>}` by the value sent for that form field.
    pub output_name: String,
    /// Fallback error text when the server gives no message.
    pub failure_message: String,
    /// Per-tool request timeout overriding [`crate::ClientConfig::timeout_secs`].
    pub timeout_secs: Option<u64>,
}

impl ToolSpec {
    /// Start describing a tool reachable at `endpoint`.
    pub fn builder(id: impl Into<String>, endpoint: impl Into<String>) -> ToolSpecBuilder {
        let id = id.into();
        ToolSpecBuilder {
            spec: ToolSpec {
                label: id.clone(),
                failure_message: format!("Failed to run {id}. Please try again."),
                id,
                endpoint: endpoint.into(),
                slots: Vec::new(),
                params: Vec::new(),
                one_of: Vec::new(),
                response: ResponseKind::blob("application/pdf"),
                output_name: "output.pdf".into(),
                timeout_secs: None,
            },
        }
    }

    /// First slot; the one [`crate::workflow::FileTransformWorkflow::select_file`] fills.
    pub fn primary_slot(&self) -> Option<&FileSlot> {
        self.slots.first()
    }

    pub fn slot(&self, field: &str) -> Option<&FileSlot> {
        self.slots.iter().find(|s| s.field == field)
    }

    /// Render [`ToolSpec::output_name`] for a given input stem and the form
    /// fields of the request.
    pub fn output_name_for(&self, stem: Option<&str>, fields: &[(String, String)]) -> String {
        let mut name = self.output_name.replace("{stem}", stem.unwrap_or("output"));
        for (field, value) in fields {
            name = name.replace(&format!("{{{field}}}"), value);
        }
        name
    }
}

/// Builder for [`ToolSpec`].
#[derive(Debug)]
pub struct ToolSpecBuilder {
    spec: ToolSpec,
}

impl ToolSpecBuilder {
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.spec.label = label.into();
        self
    }

    pub fn slot(mut self, slot: FileSlot) -> Self {
        self.spec.slots.push(slot);
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    pub fn one_of(mut self, fields: &[&str]) -> Self {
        self.spec
            .one_of
            .push(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn response(mut self, kind: ResponseKind) -> Self {
        self.spec.response = kind;
        self
    }

    pub fn output_name(mut self, template: impl Into<String>) -> Self {
        self.spec.output_name = template.into();
        self
    }

    pub fn failure_message(mut self, msg: impl Into<String>) -> Self {
        self.spec.failure_message = msg.into();
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.spec.timeout_secs = Some(secs);
        self
    }

    /// Build the spec, validating constraints.
    pub fn build(self) -> Result<ToolSpec, WorkflowError> {
        let s = &self.spec;
        if s.endpoint.trim().is_empty() {
            return Err(WorkflowError::InvalidConfig(format!(
                "tool '{}' has an empty endpoint",
                s.id
            )));
        }
        let mut seen = HashSet::new();
        for slot in &s.slots {
            if !seen.insert(slot.field.as_str()) {
                return Err(WorkflowError::InvalidConfig(format!(
                    "tool '{}' declares file slot '{}' twice",
                    s.id, slot.field
                )));
            }
            let c = &slot.constraints;
            if c.min_files > c.max_files || c.max_files == 0 {
                return Err(WorkflowError::InvalidConfig(format!(
                    "tool '{}' slot '{}': file count bounds {}..={} are empty",
                    s.id, slot.field, c.min_files, c.max_files
                )));
            }
        }
        for param in &s.params {
            if !seen.insert(param.name.as_str()) {
                return Err(WorkflowError::InvalidConfig(format!(
                    "tool '{}' uses field '{}' twice",
                    s.id, param.name
                )));
            }
        }
        if s.timeout_secs == Some(0) {
            return Err(WorkflowError::InvalidConfig(format!(
                "tool '{}' timeout must be ≥ 1 second",
                s.id
            )));
        }
        Ok(self.spec)
    }
}
