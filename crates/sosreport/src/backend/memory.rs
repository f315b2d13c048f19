//! In-process stores.
//!
//! Used for dry runs and as the test double for every flow. Both stores
//! can be told to fail so error paths are reachable without a network.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use super::{BlobStore, DocumentStore};
use crate::error::{Error, Result};
use crate::report::Report;

#[derive(Debug, Clone)]
struct StoredReport {
    collection: String,
    report: Report,
}

/// Document store held in memory.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    reports: Mutex<Vec<StoredReport>>,
    next_id: AtomicU64,
    write_failure: Option<String>,
    read_failure: Option<String>,
    write_attempts: AtomicU64,
}

impl MemoryDocumentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write fail with `message`.
    #[must_use]
    pub fn failing_writes(mut self, message: impl Into<String>) -> Self {
        self.write_failure = Some(message.into());
        self
    }

    /// Make every read fail with `message`.
    #[must_use]
    pub fn failing_reads(mut self, message: impl Into<String>) -> Self {
        self.read_failure = Some(message.into());
        self
    }

    /// Number of `create` calls made, successful or not.
    #[must_use]
    pub fn write_attempts(&self) -> u64 {
        self.write_attempts.load(Ordering::SeqCst)
    }

    /// Reports stored in `collection`, in insertion order.
    #[must_use]
    pub fn reports(&self, collection: &str) -> Vec<Report> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|stored| stored.collection == collection)
            .map(|stored| stored.report.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, collection: &str, report: &Report) -> Result<String> {
        self.write_attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.write_failure {
            return Err(Error::write(collection, message.clone()));
        }

        let id = format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(StoredReport {
                collection: collection.to_string(),
                report: report.clone().with_id(id.clone()),
            });
        Ok(id)
    }

    async fn list_newest_first(&self, collection: &str) -> Result<Vec<Report>> {
        if let Some(message) = &self.read_failure {
            return Err(Error::read(collection, message.clone()));
        }

        let mut reports = self.reports(collection);
        reports.sort_by(|a, b| b.call_time.cmp(&a.call_time));
        Ok(reports)
    }
}

/// An object held by [`MemoryBlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Uploaded bytes.
    pub bytes: Vec<u8>,
    /// MIME type given at upload.
    pub content_type: String,
}

/// Blob store held in memory. URLs have the form `memory://<key>`.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: Mutex<BTreeMap<String, StoredBlob>>,
    failing_fragments: Vec<String>,
}

impl MemoryBlobStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail uploads whose key contains `fragment`.
    #[must_use]
    pub fn failing_keys(mut self, fragment: impl Into<String>) -> Self {
        self.failing_fragments.push(fragment.into());
        self
    }

    /// The object stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoredBlob> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// All stored keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String> {
        if self
            .failing_fragments
            .iter()
            .any(|fragment| key.contains(fragment.as_str()))
        {
            return Err(Error::upload(key, "storage unavailable"));
        }

        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                key.to_string(),
                StoredBlob {
                    bytes: bytes.to_vec(),
                    content_type: content_type.to_string(),
                },
            );
        Ok(format!("memory://{key}"))
    }
}
