//! Package records: the unit of storage.

use crate::hash::Checksum;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Metadata for one stored package.
///
/// A record is produced fresh from a filesystem stat plus the stored
/// checksum; nothing here is cached across writes. `name` is the primary key
/// within the store, and `modified_at` is the sole ordering key for both
/// retention and "latest release" queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Filename, unique within the store.
    pub name: String,
    /// Exact byte length of the stored content.
    pub size: u64,
    /// Filesystem modification time, refreshed on every write.
    #[serde(with = "time::serde::rfc3339")]
    pub modified_at: OffsetDateTime,
    /// SHA-256 of the stored bytes, lowercase hex.
    pub checksum: Checksum,
}

impl PackageRecord {
    /// Download path for this record under the server's asset route.
    pub fn download_path(&self) -> String {
        format!("/assets/{}", self.name)
    }
}
