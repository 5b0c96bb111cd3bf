//! Package storage for the shelf release server.
//!
//! This crate owns the on-disk package directory. It provides:
//! - The [`PackageStore`] trait: the only interface through which packages
//!   are written, read, enumerated, or deleted
//! - [`FilesystemStore`]: a flat-directory backend with atomic
//!   temp-file-plus-rename writes and streaming checksums

pub mod error;
pub mod filesystem;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemStore;
pub use traits::{ByteStream, PackageStore};

use shelf_core::config::StorageConfig;
use std::sync::Arc;

/// Create a package store from configuration.
pub async fn from_config(config: &StorageConfig) -> StoreResult<Arc<dyn PackageStore>> {
    let store = FilesystemStore::new(&config.path).await?;
    Ok(Arc::new(store))
}
