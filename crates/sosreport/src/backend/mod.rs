//! Backend abstraction for reports and media.
//!
//! The flows talk to two stores through narrow traits:
//!
//! - [`DocumentStore`]: create-only writes and an ordered bulk read of
//!   report documents.
//! - [`BlobStore`]: keyed binary uploads that yield a download URL.
//!
//! Implementations live in [`memory`], [`firebase`] and
//! [`crate::storage`] (the local SQLite/filesystem backend).

pub mod firebase;
pub mod memory;

use std::sync::Arc;

use tracing::debug;

use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::report::Report;
use crate::storage::{DirectoryBlobStore, Storage};

pub use memory::{MemoryBlobStore, MemoryDocumentStore};

/// A query-capable store of report documents.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of this backend (for logging).
    fn name(&self) -> &'static str;

    /// Create a new document in `collection`, returning its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Write`] if the store rejects the document.
    async fn create(&self, collection: &str, report: &Report) -> Result<String>;

    /// Fetch every document in `collection`, newest `callTime` first.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Read`] if the query fails.
    async fn list_newest_first(&self, collection: &str) -> Result<Vec<Report>>;
}

/// Keyed storage for binary media.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Name of this backend (for logging).
    fn name(&self) -> &'static str;

    /// Store `bytes` under `key` and return a URL that resolves to them.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Upload`] if the upload fails.
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String>;
}

/// The pair of stores a command works against.
#[derive(Clone)]
pub struct Backends {
    /// Report documents.
    pub documents: Arc<dyn DocumentStore>,
    /// Media blobs.
    pub blobs: Arc<dyn BlobStore>,
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("documents", &self.documents.name())
            .field("blobs", &self.blobs.name())
            .finish()
    }
}

impl Backends {
    /// Build the backends selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the local database cannot be opened or the HTTP
    /// client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!("Using {} backend", config.backend.kind);
        let backends = match config.backend.kind {
            BackendKind::Local => Self {
                documents: Arc::new(Storage::open(config.database_path())?),
                blobs: Arc::new(DirectoryBlobStore::new(config.blob_dir())),
            },
            BackendKind::Firebase => {
                let client = firebase::FirebaseClient::new(&config.backend.firebase)?;
                Self {
                    documents: Arc::new(firebase::FirestoreDocuments::new(client.clone())),
                    blobs: Arc::new(firebase::FirebaseStorage::new(client)),
                }
            }
            BackendKind::Memory => Self::in_memory(),
        };
        Ok(backends)
    }

    /// Fresh in-process stores.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            documents: Arc::new(MemoryDocumentStore::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
        }
    }
}
