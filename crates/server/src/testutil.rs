//! In-memory package store for exercising service and retention logic
//! without a filesystem.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use shelf_core::hash::Checksum;
use shelf_core::PackageRecord;
use shelf_storage::{ByteStream, PackageStore, StoreError, StoreResult};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use time::OffsetDateTime;

#[derive(Clone)]
struct StoredEntry {
    data: Vec<u8>,
    modified_at: OffsetDateTime,
}

/// A `PackageStore` backed by a map, with hooks to simulate delete races
/// and failures.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredEntry>>,
    failing_deletes: Mutex<HashSet<String>>,
    vanishing_deletes: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry directly, with a controlled modification time.
    pub async fn seed(&self, name: &str, data: &[u8], modified_at: OffsetDateTime) {
        self.entries.lock().unwrap().insert(
            name.to_string(),
            StoredEntry {
                data: data.to_vec(),
                modified_at,
            },
        );
    }

    /// Make `delete(name)` fail with an I/O error.
    pub async fn fail_delete_of(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    /// Make `delete(name)` behave as if another process already removed the
    /// file: the entry disappears but the call reports nothing deleted.
    pub async fn vanish_on_delete(&self, name: &str) {
        self.vanishing_deletes
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    fn record_for(name: &str, entry: &StoredEntry) -> PackageRecord {
        PackageRecord {
            name: name.to_string(),
            size: entry.data.len() as u64,
            modified_at: entry.modified_at,
            checksum: Checksum::compute(&entry.data),
        }
    }
}

#[async_trait]
impl PackageStore for MemoryStore {
    async fn save(
        &self,
        name: &str,
        mut stream: ByteStream,
        overwrite: bool,
    ) -> StoreResult<PackageRecord> {
        if !overwrite && self.entries.lock().unwrap().contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk?);
        }

        let entry = StoredEntry {
            data,
            modified_at: OffsetDateTime::now_utc(),
        };
        let record = Self::record_for(name, &entry);
        self.entries.lock().unwrap().insert(name.to_string(), entry);
        Ok(record)
    }

    async fn open(&self, name: &str) -> StoreResult<ByteStream> {
        let entry = self
            .entries
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(Bytes::from(
            entry.data,
        ))])))
    }

    async fn stat(&self, name: &str) -> StoreResult<PackageRecord> {
        self.entries
            .lock()
            .unwrap()
            .get(name)
            .map(|entry| Self::record_for(name, entry))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn exists(&self, name: &str) -> StoreResult<bool> {
        Ok(self.entries.lock().unwrap().contains_key(name))
    }

    async fn delete(&self, name: &str) -> StoreResult<bool> {
        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(StoreError::Io(std::io::Error::other("simulated failure")));
        }
        if self.vanishing_deletes.lock().unwrap().contains(name) {
            self.entries.lock().unwrap().remove(name);
            return Ok(false);
        }
        Ok(self.entries.lock().unwrap().remove(name).is_some())
    }

    async fn list(&self) -> StoreResult<Vec<PackageRecord>> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, entry)| Self::record_for(name, entry))
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Build a single-chunk byte stream for tests.
pub fn stream_of(data: &[u8]) -> ByteStream {
    Box::pin(futures::stream::iter(vec![Ok(Bytes::copy_from_slice(
        data,
    ))]))
}
