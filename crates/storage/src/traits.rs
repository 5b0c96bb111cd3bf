//! Package store trait definition.

use crate::error::StoreResult;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use shelf_core::PackageRecord;
use std::pin::Pin;

/// A boxed stream of bytes, used both for upload bodies flowing into the
/// store and for download bodies flowing out of it.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// The package store abstraction.
///
/// This is the only seam through which the package directory is touched.
/// The service and retention layers depend on this trait, never on the
/// filesystem directly.
#[async_trait]
pub trait PackageStore: Send + Sync + 'static {
    /// Persist an uploaded byte stream under `name`, atomically.
    ///
    /// Fails with `InvalidName` before any I/O if the name is unsafe, and
    /// with `AlreadyExists` (no filesystem mutation) when the name is taken
    /// and `overwrite` is false. The stream is written to a temporary file
    /// in the store directory while its checksum is computed, then renamed
    /// onto the final name in one step: a concurrent reader observes either
    /// the complete old bytes or the complete new bytes, never a partial
    /// file. Any mid-stream failure removes the temporary file and leaves a
    /// pre-existing package untouched.
    async fn save(
        &self,
        name: &str,
        stream: ByteStream,
        overwrite: bool,
    ) -> StoreResult<PackageRecord>;

    /// Open a package for streaming reads. `NotFound` when absent.
    async fn open(&self, name: &str) -> StoreResult<ByteStream>;

    /// Fetch the current record for one package. `NotFound` when absent.
    async fn stat(&self, name: &str) -> StoreResult<PackageRecord>;

    /// Check whether a package exists.
    async fn exists(&self, name: &str) -> StoreResult<bool>;

    /// Remove a package if present; returns whether anything was deleted.
    /// Absence is not an error, so concurrent retention passes racing on
    /// the same victim are harmless.
    async fn delete(&self, name: &str) -> StoreResult<bool>;

    /// Enumerate all packages with freshly-read metadata. Order is
    /// unspecified; callers sort as needed.
    async fn list(&self) -> StoreResult<Vec<PackageRecord>>;

    /// Static identifier for the backend, used in logs.
    fn backend_name(&self) -> &'static str;

    /// Verify the store is usable.
    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
