//! Revocable references to result blobs.
//!
//! A browser exposes a downloaded blob through an object URL that stays alive
//! until it is explicitly revoked. [`ObjectUrlStore`] plays the same role for
//! this crate: every successful submission registers its blob and receives a
//! fresh [`ObjectUrl`]; the owning workflow revokes it when the result is
//! superseded, reset or dropped. [`ObjectUrlStore::live_count`] makes leaks
//! observable.
//!
//! The store is cheap to clone and may be shared by many workflows, mirroring
//! the single page-wide URL table a browser keeps.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Scheme prefix of every URL handed out by the store.
pub const OBJECT_URL_PREFIX: &str = "blob:pdftools/";

/// An opaque binary payload and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub bytes: Bytes,
    pub mime: String,
}

/// Handle to a registered blob. Never reused once revoked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl {
    id: Uuid,
}

impl ObjectUrl {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// `blob:pdftools/<uuid>`
    pub fn href(&self) -> String {
        format!("{OBJECT_URL_PREFIX}{}", self.id)
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{OBJECT_URL_PREFIX}{}", self.id)
    }
}

/// Shared table of live object URLs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlStore {
    inner: Arc<Mutex<HashMap<Uuid, Blob>>>,
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<Uuid, Blob>> {
        // A panic while holding the lock cannot leave the map half-updated:
        // every critical section is a single insert/remove/get.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register `blob` and return a new URL for it.
    pub fn create(&self, blob: Blob) -> ObjectUrl {
        let url = ObjectUrl { id: Uuid::new_v4() };
        debug!("Created {} ({} bytes, {})", url, blob.bytes.len(), blob.mime);
        self.table().insert(url.id, blob);
        url
    }

    /// Look up a live URL.
    pub fn resolve(&self, url: &ObjectUrl) -> Option<Blob> {
        self.table().get(&url.id).cloned()
    }

    /// Release a URL. Returns `false` if it was already revoked.
    pub fn revoke(&self, url: &ObjectUrl) -> bool {
        let removed = self.table().remove(&url.id).is_some();
        if removed {
            debug!("Revoked {}", url);
        }
        removed
    }

    /// Number of URLs not yet revoked.
    pub fn live_count(&self) -> usize {
        self.table().len()
    }
}
