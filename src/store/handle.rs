//! Lazily opened, process-owned handle to the document store.
//!
//! The handle is created once at startup and passed explicitly to whoever
//! needs the store (CLI commands, server state). The connection is opened on
//! first use and shared behind a mutex.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::core::errors::Result;
use crate::store::sqlite::DocumentStore;

/// Shared, lazily initialized document-store connection.
pub struct StoreHandle {
    path: PathBuf,
    slot: Mutex<Option<DocumentStore>>,
}

impl StoreHandle {
    /// Handle for the database at `path`. Nothing is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            slot: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the connection has been opened.
    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Run `f` against the store, opening it first if needed.
    ///
    /// A failed open leaves the handle closed so the next call retries.
    pub fn with<T>(&self, f: impl FnOnce(&DocumentStore) -> Result<T>) -> Result<T> {
        let mut guard = self.slot.lock();
        if let Some(store) = guard.as_ref() {
            return f(store);
        }
        let store = DocumentStore::open(&self.path)?;
        tracing::info!(path = %self.path.display(), "document store opened");
        let result = f(&store);
        *guard = Some(store);
        result
    }

    /// Drop the connection; the next call reopens it.
    pub fn close(&self) {
        if self.slot.lock().take().is_some() {
            tracing::debug!(path = %self.path.display(), "document store closed");
        }
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("path", &self.path)
            .field("open", &self.is_open())
            .finish()
    }
}
