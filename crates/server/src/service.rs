//! Package service: the use-case orchestrator behind the HTTP handlers.

use crate::retention::RetentionPolicy;
use shelf_core::PackageRecord;
use shelf_storage::{ByteStream, PackageStore, StoreError, StoreResult};
use std::sync::Arc;
use tracing::instrument;

/// Result of a successful upload: the stored record plus whatever the
/// retention pass evicted while handling it.
#[derive(Debug)]
pub struct UploadOutcome {
    pub record: PackageRecord,
    pub evicted: Vec<String>,
}

/// Orchestrates uploads, listings, downloads, and deletes over a
/// [`PackageStore`]. All conflict and overwrite decisions happen in the
/// store's `save`; retention runs synchronously after every successful
/// write, so the ceiling holds by the time an upload response is produced.
pub struct PackageService {
    store: Arc<dyn PackageStore>,
    retention: RetentionPolicy,
    max_packages: usize,
}

impl PackageService {
    /// Create a new service over the given store.
    pub fn new(store: Arc<dyn PackageStore>, max_packages: usize) -> Self {
        let retention = RetentionPolicy::new(store.clone());
        Self {
            store,
            retention,
            max_packages,
        }
    }

    /// Persist an upload and enforce retention.
    ///
    /// Conflict (`AlreadyExists`), invalid-name, and I/O errors propagate
    /// unchanged for the transport layer to map onto status codes.
    #[instrument(skip(self, stream))]
    pub async fn upload(
        &self,
        name: &str,
        stream: ByteStream,
        overwrite: bool,
    ) -> StoreResult<UploadOutcome> {
        let record = self.store.save(name, stream, overwrite).await?;
        let evicted = self.retention.enforce(self.max_packages).await?;
        Ok(UploadOutcome { record, evicted })
    }

    /// All packages, newest first; ties broken by name for a stable order.
    pub async fn list_packages(&self) -> StoreResult<Vec<PackageRecord>> {
        let mut records = self.store.list().await?;
        records.sort_by(|a, b| {
            b.modified_at
                .cmp(&a.modified_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }

    /// The single most-recently-modified package.
    pub async fn get_latest(&self) -> StoreResult<PackageRecord> {
        self.list_packages()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound("no packages stored".to_string()))
    }

    /// Remove a package; `false` when nothing existed.
    pub async fn delete_package(&self, name: &str) -> StoreResult<bool> {
        self.store.delete(name).await
    }

    /// Open a package for download, returning its current record alongside
    /// the body stream.
    pub async fn open_package(&self, name: &str) -> StoreResult<(PackageRecord, ByteStream)> {
        let record = self.store.stat(name).await?;
        let stream = self.store.open(name).await?;
        Ok((record, stream))
    }

    /// Health probe used by the readiness endpoint.
    pub async fn check_storage(&self) -> StoreResult<()> {
        self.store.list().await.map(|_| ())
    }
}
