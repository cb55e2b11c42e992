//! Selected input files and the constraints a tool places on them.
//!
//! A [`SelectedFile`] owns its bytes as a cheaply clonable [`Bytes`] buffer, so
//! building a multipart request never copies the workflow's selection and the
//! selection itself is never mutated: re-selecting replaces it wholesale.

use crate::error::{ValidationError, WorkflowError};
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

/// MIME type assumed when the extension tells us nothing.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A user-chosen input file.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    name: String,
    mime: String,
    bytes: Bytes,
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("size", &self.size())
            .finish()
    }
}

impl SelectedFile {
    /// Wrap in-memory bytes with an explicit MIME type.
    pub fn from_bytes(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Wrap in-memory bytes, guessing the MIME type from the file name.
    pub fn guessed(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let mime = guess_mime(Path::new(&name));
        Self::from_bytes(name, mime, bytes)
    }

    /// Read a file from disk. The MIME type is guessed from its extension,
    /// the way a browser labels a file picked from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, WorkflowError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| WorkflowError::FileRead {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());
        let mime = guess_mime(path);
        debug!("Selected {} ({}, {} bytes)", name, mime, bytes.len());
        Ok(Self::from_bytes(name, mime, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// File name without its final extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

fn guess_mime(path: &Path) -> String {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| OCTET_STREAM.to_string())
}

/// Limits a file slot places on its selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileConstraints {
    /// Accepted MIME types. Empty means any type.
    pub accepted_mime: Vec<String>,
    /// Per-file byte ceiling, inclusive.
    pub max_bytes: u64,
    /// Minimum number of files.
    pub min_files: usize,
    /// Maximum number of files.
    pub max_files: usize,
}

impl Default for FileConstraints {
    fn default() -> Self {
        Self {
            accepted_mime: Vec::new(),
            max_bytes: crate::config::DEFAULT_MAX_FILE_BYTES,
            min_files: 1,
            max_files: 1,
        }
    }
}

impl FileConstraints {
    /// A single file of one of `mimes`, at most `max_bytes`.
    pub fn single(mimes: &[&str], max_bytes: u64) -> Self {
        Self {
            accepted_mime: mimes.iter().map(|m| m.to_string()).collect(),
            max_bytes,
            ..Self::default()
        }
    }

    /// Between `min` and `max` files of one of `mimes`.
    pub fn multiple(mimes: &[&str], max_bytes: u64, min: usize, max: usize) -> Self {
        Self {
            accepted_mime: mimes.iter().map(|m| m.to_string()).collect(),
            max_bytes,
            min_files: min,
            max_files: max,
        }
    }

    pub fn accepts_mime(&self, mime: &str) -> bool {
        self.accepted_mime.is_empty() || self.accepted_mime.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }

    /// Check one file's type and size.
    pub fn check_file(&self, file: &SelectedFile) -> Result<(), ValidationError> {
        if !self.accepts_mime(file.mime()) {
            return Err(ValidationError::UnsupportedFileType {
                name: file.name().to_string(),
                mime: file.mime().to_string(),
            });
        }
        if file.size() > self.max_bytes {
            return Err(ValidationError::FileTooLarge {
                name: file.name().to_string(),
                size: file.size(),
                max: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Check a whole selection for slot `slot`: count first, then every file.
    pub fn check_selection(&self, slot: &str, files: &[SelectedFile]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::NoFileSelected {
                slot: slot.to_string(),
            });
        }
        if files.len() < self.min_files {
            return Err(ValidationError::TooFewFiles {
                slot: slot.to_string(),
                min: self.min_files,
                got: files.len(),
            });
        }
        if files.len() > self.max_files {
            return Err(ValidationError::TooManyFiles {
                slot: slot.to_string(),
                max: self.max_files,
                got: files.len(),
            });
        }
        files.iter().try_for_each(|f| self.check_file(f))
    }
}
