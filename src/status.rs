//! Observable workflow status.

use crate::error::{ErrorKind, WorkflowError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error as published on the status channel: classified and displayable,
/// but cloneable (unlike [`WorkflowError`], which may own an `io::Error`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&WorkflowError> for StatusError {
    fn from(e: &WorkflowError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Where a workflow is in its select → submit → result cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowStatus {
    #[default]
    Idle,
    Loading,
    Success,
    Error(StatusError),
}

impl WorkflowStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, WorkflowStatus::Loading)
    }

    pub fn error(&self) -> Option<&StatusError> {
        match self {
            WorkflowStatus::Error(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowStatus::Idle => f.write_str("idle"),
            WorkflowStatus::Loading => f.write_str("loading"),
            WorkflowStatus::Success => f.write_str("success"),
            WorkflowStatus::Error(e) => write!(f, "error: {e}"),
        }
    }
}
