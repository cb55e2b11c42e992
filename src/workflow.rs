//! The generic select → validate → submit → result controller.
//!
//! ## State machine
//!
//! ```text
//!            select / reset
//!   ┌────────────────────────────────┐
//!   ▼                                │
//! Idle ──submit──▶ Loading ──▶ Success ─┤
//!                    │                  │
//!                    └──────▶ Error ────┘
//! ```
//!
//! One [`FileTransformWorkflow`] drives one [`ToolSpec`]. All methods take
//! `&self`; wrap the workflow in an `Arc` to reset or re-select from another
//! task while a submission is awaiting its response.
//!
//! ## Stale responses
//!
//! Every submission is stamped with a token and a [`CancellationToken`].
//! `reset`, a successful re-selection and `Drop` cancel the token, which drops
//! the in-flight reqwest future. A reply that still arrives is compared against
//! the current token and discarded when they differ, so a superseded request
//! can never overwrite newer state.

use crate::backend;
use crate::config::ClientConfig;
use crate::error::{ValidationError, WorkflowError};
use crate::file::SelectedFile;
use crate::object_url::{Blob, ObjectUrl, ObjectUrlStore};
use crate::params::{self, Parameters};
use crate::pipeline::request::TransformRequest;
use crate::pipeline::response::classify;
use crate::pipeline::transport::Transport;
use crate::progress::{NoopObserver, SharedObserver};
use crate::status::{StatusError, WorkflowStatus};
use crate::tool::ToolSpec;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Metadata of the current result. The bytes live in the [`ObjectUrlStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub url: ObjectUrl,
    pub filename: String,
    pub mime: String,
    pub size: usize,
}

/// A resolved result, ready to save or inspect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub url: ObjectUrl,
    pub filename: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl Download {
    /// Body as UTF-8 text (OCR output).
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    /// Body as JSON (comparison report).
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, WorkflowError> {
        serde_json::from_slice(&self.bytes).map_err(|e| WorkflowError::Application {
            message: format!("Result is not the expected JSON document: {e}"),
        })
    }

    /// Write the result to `target`.
    ///
    /// A directory target receives [`Download::filename`]. The write goes to a
    /// temporary file in the destination directory which is then renamed into
    /// place, so a failed save never leaves a truncated file behind.
    pub async fn save_to(&self, target: impl AsRef<Path>) -> Result<PathBuf, WorkflowError> {
        let target = target.as_ref();
        let path = if tokio::fs::metadata(target)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            target.join(&self.filename)
        } else {
            target.to_path_buf()
        };
        let bytes = self.bytes.clone();
        let dest = path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&dest, &bytes))
            .await
            .map_err(|e| WorkflowError::Internal(format!("save task failed: {e}")))?
            .map_err(|source| WorkflowError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;
        info!("Saved {} ({} bytes)", path.display(), self.bytes.len());
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

struct InFlight {
    token: u64,
    cancel: CancellationToken,
}

#[derive(Default)]
struct State {
    selections: BTreeMap<String, Vec<SelectedFile>>,
    page_count: Option<u32>,
    result: Option<TransformResult>,
    in_flight: Option<InFlight>,
    next_token: u64,
}

impl State {
    fn cancel_in_flight(&mut self) -> bool {
        match self.in_flight.take() {
            Some(flight) => {
                flight.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn release_result(&mut self, store: &ObjectUrlStore) {
        if let Some(old) = self.result.take() {
            store.revoke(&old.url);
        }
    }
}

/// Controller for one tool.
pub struct FileTransformWorkflow {
    tool: ToolSpec,
    transport: Transport,
    store: ObjectUrlStore,
    observer: SharedObserver,
    state: Mutex<State>,
    status_tx: watch::Sender<WorkflowStatus>,
}

impl FileTransformWorkflow {
    pub fn new(tool: ToolSpec, transport: Transport, store: ObjectUrlStore) -> Self {
        let (status_tx, _) = watch::channel(WorkflowStatus::Idle);
        Self {
            tool,
            transport,
            store,
            observer: Arc::new(NoopObserver),
            state: Mutex::new(State::default()),
            status_tx,
        }
    }

    /// Workflow with its own transport and URL store.
    pub fn from_config(tool: ToolSpec, config: ClientConfig) -> Result<Self, WorkflowError> {
        Ok(Self::new(tool, Transport::new(config)?, ObjectUrlStore::new()))
    }

    pub fn with_observer(mut self, observer: SharedObserver) -> Self {
        self.observer = observer;
        self
    }

    pub fn tool(&self) -> &ToolSpec {
        &self.tool
    }

    pub fn store(&self) -> &ObjectUrlStore {
        &self.store
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a status while the state lock is held, so a concurrent reset
    /// cannot interleave between the state change and its announcement.
    fn publish(&self, _guard: &MutexGuard<'_, State>, status: WorkflowStatus) -> WorkflowStatus {
        self.status_tx.send_replace(status.clone());
        status
    }

    fn notify(&self, status: &WorkflowStatus) {
        self.observer.on_status_change(status);
    }

    // ── Selection ─────────────────────────────────────────────────────────

    /// Select a single file for the tool's primary slot.
    pub fn select_file(&self, file: SelectedFile) -> Result<(), ValidationError> {
        let slot = match self.tool.primary_slot() {
            Some(slot) => slot.field.clone(),
            None => {
                return Err(ValidationError::UnknownSlot {
                    slot: "file".to_string(),
                })
            }
        };
        self.select_files(&slot, vec![file])
    }

    /// Replace the selection of `slot`.
    ///
    /// On rejection the existing selection is kept and, unless a submission is
    /// in flight, status becomes `Error`. On success any in-flight submission
    /// is superseded, the previous result is released and status is `Idle`.
    pub fn select_files(&self, slot: &str, files: Vec<SelectedFile>) -> Result<(), ValidationError> {
        let spec = self.tool.slot(slot).ok_or_else(|| ValidationError::UnknownSlot {
            slot: slot.to_string(),
        })?;

        if let Err(e) = spec.constraints.check_selection(slot, &files) {
            warn!("[{}] Rejected selection for '{}': {}", self.tool.id, slot, e);
            let state = self.lock();
            if state.in_flight.is_none() {
                let status = self.publish(
                    &state,
                    WorkflowStatus::Error(StatusError::from(&WorkflowError::from(e.clone()))),
                );
                drop(state);
                self.notify(&status);
            }
            return Err(e);
        }

        let mut state = self.lock();
        if state.cancel_in_flight() {
            info!("[{}] New selection supersedes in-flight request", self.tool.id);
        }
        state.release_result(&self.store);
        let is_primary = self.tool.primary_slot().map(|s| s.field.as_str()) == Some(slot);
        if is_primary && state.selections.get(slot) != Some(&files) {
            state.page_count = None;
        }
        debug!(
            "[{}] Selected {} file(s) for '{}'",
            self.tool.id,
            files.len(),
            slot
        );
        state.selections.insert(slot.to_string(), files);
        let status = self.publish(&state, WorkflowStatus::Idle);
        drop(state);
        self.notify(&status);
        Ok(())
    }

    /// Current selection of `slot` (empty if none).
    pub fn selection(&self, slot: &str) -> Vec<SelectedFile> {
        self.lock().selections.get(slot).cloned().unwrap_or_default()
    }

    // ── Page count ────────────────────────────────────────────────────────

    pub fn page_count(&self) -> Option<u32> {
        self.lock().page_count
    }

    /// Record the primary input's page count for page-range validation.
    pub fn set_page_count(&self, pages: Option<u32>) {
        self.lock().page_count = pages;
    }

    /// Ask the backend for the primary input's page count and record it.
    pub async fn fetch_page_count(&self) -> Result<u32, WorkflowError> {
        let slot = self
            .tool
            .primary_slot()
            .map(|s| s.field.clone())
            .unwrap_or_else(|| "file".to_string());
        let file = self
            .lock()
            .selections
            .get(&slot)
            .and_then(|files| files.first().cloned())
            .ok_or_else(|| ValidationError::NoFileSelected { slot: slot.clone() })?;

        let pages = backend::page_count(&self.transport, &file).await?;

        let mut state = self.lock();
        let still_selected = state
            .selections
            .get(&slot)
            .and_then(|files| files.first())
            == Some(&file);
        if still_selected {
            state.page_count = Some(pages);
        }
        Ok(pages)
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Validate the selection and `params`, send exactly one request and
    /// store the result.
    ///
    /// Returns [`WorkflowError::Busy`] without touching status if a
    /// submission is already in flight, and [`WorkflowError::Cancelled`] if
    /// this submission was superseded before its reply arrived.
    pub async fn submit(&self, params: &Parameters) -> Result<Download, WorkflowError> {
        let (request, token, cancel, default_name) = {
            let mut state = self.lock();
            if state.in_flight.is_some() {
                debug!("[{}] Submit ignored: request already in flight", self.tool.id);
                return Err(WorkflowError::Busy);
            }

            match self.build_request(&state, params) {
                Ok((request, default_name)) => {
                    state.next_token += 1;
                    let token = state.next_token;
                    let cancel = CancellationToken::new();
                    state.in_flight = Some(InFlight {
                        token,
                        cancel: cancel.clone(),
                    });
                    let status = self.publish(&state, WorkflowStatus::Loading);
                    drop(state);
                    self.notify(&status);
                    (request, token, cancel, default_name)
                }
                Err(e) => {
                    let err = WorkflowError::from(e);
                    warn!("[{}] {}", self.tool.id, err);
                    let status = self.publish(&state, WorkflowStatus::Error(StatusError::from(&err)));
                    drop(state);
                    self.notify(&status);
                    return Err(err);
                }
            }
        };

        info!("[{}] {}", self.tool.id, request.describe());
        self.observer
            .on_upload_start(&self.tool.id, request.file_count(), request.total_bytes());

        let config = self.transport.config();
        let timeout = self.tool.timeout_secs.unwrap_or(config.timeout_secs);
        let outcome = self
            .transport
            .post_multipart(&request, timeout, &cancel)
            .await
            .and_then(|raw| classify(raw, &self.tool, &default_name, config.min_result_bytes));

        let mut state = self.lock();
        let current = state.in_flight.as_ref().map(|f| f.token) == Some(token);
        if !current {
            drop(state);
            warn!("[{}] Discarding response of superseded request", self.tool.id);
            self.observer.on_discarded(&self.tool.id);
            return Err(WorkflowError::Cancelled);
        }
        state.in_flight = None;

        match outcome {
            Ok(classified) => {
                state.release_result(&self.store);
                let size = classified.bytes.len();
                let url = self.store.create(Blob {
                    bytes: classified.bytes.clone(),
                    mime: classified.mime.clone(),
                });
                state.result = Some(TransformResult {
                    url: url.clone(),
                    filename: classified.filename.clone(),
                    mime: classified.mime.clone(),
                    size,
                });
                let status = self.publish(&state, WorkflowStatus::Success);
                drop(state);
                info!(
                    "[{}] Result ready: {} ({} bytes)",
                    self.tool.id, classified.filename, size
                );
                self.notify(&status);
                self.observer.on_result(&url, &classified.filename, size);
                Ok(Download {
                    url,
                    filename: classified.filename,
                    mime: classified.mime,
                    bytes: classified.bytes,
                })
            }
            Err(err) => {
                let status = self.publish(&state, WorkflowStatus::Error(StatusError::from(&err)));
                drop(state);
                warn!("[{}] Request failed: {}", self.tool.id, err);
                self.notify(&status);
                Err(err)
            }
        }
    }

    fn build_request(
        &self,
        state: &State,
        params: &Parameters,
    ) -> Result<(TransformRequest, String), ValidationError> {
        let mut request = TransformRequest::new(self.tool.endpoint.clone());
        let mut filled = BTreeSet::new();

        for slot in &self.tool.slots {
            let files = state
                .selections
                .get(&slot.field)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            if files.is_empty() && !slot.required {
                continue;
            }
            slot.constraints.check_selection(&slot.field, files)?;
            filled.insert(slot.field.as_str());
            for file in files {
                request.parts.push((slot.field.clone(), file.clone()));
            }
        }

        request.fields = params::resolve(
            &self.tool.params,
            &self.tool.one_of,
            params,
            state.page_count,
            &filled,
        )?;
        request.secret_fields = self
            .tool
            .params
            .iter()
            .filter(|p| p.is_secret())
            .map(|p| p.name.clone())
            .collect();

        let input_stem = self
            .tool
            .primary_slot()
            .and_then(|s| state.selections.get(&s.field))
            .and_then(|files| files.first())
            .map(|f| f.stem().to_string());
        let default_name = self.tool.output_name_for(input_stem.as_deref(), &request.fields);
        Ok((request, default_name))
    }

    // ── Reset / result ────────────────────────────────────────────────────

    /// Clear selections, page count and result; cancel any in-flight request.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.cancel_in_flight() {
            info!("[{}] Reset cancelled in-flight request", self.tool.id);
        }
        state.release_result(&self.store);
        state.selections.clear();
        state.page_count = None;
        let status = self.publish(&state, WorkflowStatus::Idle);
        drop(state);
        self.notify(&status);
    }

    /// The current result, resolved through the store.
    pub fn download(&self) -> Option<Download> {
        let result = self.lock().result.clone()?;
        let blob = self.store.resolve(&result.url)?;
        Some(Download {
            url: result.url,
            filename: result.filename,
            mime: blob.mime,
            bytes: blob.bytes,
        })
    }

    pub fn result(&self) -> Option<TransformResult> {
        self.lock().result.clone()
    }

    // ── Status ────────────────────────────────────────────────────────────

    pub fn status(&self) -> WorkflowStatus {
        self.status_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.status_tx.subscribe()
    }

    /// Status changes as a stream, starting with the current value.
    pub fn status_stream(&self) -> WatchStream<WorkflowStatus> {
        WatchStream::new(self.subscribe())
    }
}

impl Drop for FileTransformWorkflow {
    fn drop(&mut self) {
        let state = self
            .state
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.cancel_in_flight();
        state.release_result(&self.store);
    }
}

impl std::fmt::Debug for FileTransformWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTransformWorkflow")
            .field("tool", &self.tool.id)
            .field("status", &self.status())
            .finish()
    }
}
