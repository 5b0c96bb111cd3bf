//! Flat-directory filesystem store.

use crate::error::{StoreError, StoreResult};
use crate::traits::{ByteStream, PackageStore};
use async_trait::async_trait;
use futures::StreamExt;
use shelf_core::hash::Checksum;
use shelf_core::{PackageRecord, STREAM_CHUNK_SIZE};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::instrument;
use uuid::Uuid;

/// Maximum package name length in bytes.
const MAX_NAME_LEN: usize = 255;

/// Prefix for in-flight temporary files inside the store directory.
const TEMP_PREFIX: &str = ".tmp.";

/// Filesystem-backed package store over a single flat directory.
///
/// Every visible file in the directory is one package; hidden files
/// (leading `.`) are internal: in-flight temporaries and checksum sidecars.
pub struct FilesystemStore {
    root: PathBuf,
}

/// Validate a package name before any filesystem operation.
///
/// Names are plain filenames: no path separators, no `.`/`..`, no NUL, and
/// no leading dot (reserved for temporaries and sidecars).
fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::InvalidName("name is empty".to_string()));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(StoreError::InvalidName(format!(
            "name exceeds {MAX_NAME_LEN} bytes: {name}"
        )));
    }
    if name == "." || name == ".." {
        return Err(StoreError::InvalidName(format!(
            "path traversal not allowed: {name}"
        )));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(StoreError::InvalidName(format!(
            "path separators not allowed: {name}"
        )));
    }
    if name.contains('\0') {
        return Err(StoreError::InvalidName("name contains NUL".to_string()));
    }
    if name.starts_with('.') {
        return Err(StoreError::InvalidName(format!(
            "leading dot is reserved: {name}"
        )));
    }
    Ok(())
}

/// Removes a temporary file on drop unless disarmed after a successful
/// rename. Covers both the mid-stream failure path and client cancellation,
/// where the save future is dropped before cleanup code runs.
struct TempGuard {
    path: PathBuf,
    armed: bool,
}

impl TempGuard {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

impl FilesystemStore {
    /// Create a new filesystem store, creating the directory if needed.
    pub async fn new(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Full path for a validated package name.
    fn package_path(&self, name: &str) -> StoreResult<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Sidecar path caching the checksum for a package.
    fn sidecar_path(&self, name: &str) -> PathBuf {
        self.root.join(format!(".{name}.sha256"))
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(format!("{TEMP_PREFIX}{}", Uuid::new_v4()))
    }

    /// Write the checksum sidecar atomically. Failures are logged and
    /// swallowed: the sidecar is a cache, and `load_checksum` recomputes
    /// from the package bytes whenever it is missing or stale.
    async fn write_sidecar(&self, name: &str, checksum: &Checksum, size: u64) {
        let result: StoreResult<()> = async {
            let temp = TempGuard::new(self.temp_path());
            fs::write(temp.path(), format!("{} {size}\n", checksum.to_hex())).await?;
            fs::rename(temp.path(), self.sidecar_path(name)).await?;
            temp.disarm();
            Ok(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(name, error = %e, "failed to write checksum sidecar");
        }
    }

    /// Load the checksum for a package of known size, preferring the
    /// sidecar and falling back to recomputing from the stored bytes. The
    /// sidecar records the size it was computed for; a disagreement with
    /// the current stat size marks it stale.
    async fn load_checksum(&self, name: &str, size: u64) -> StoreResult<Checksum> {
        if let Ok(contents) = fs::read_to_string(self.sidecar_path(name)).await {
            let mut parts = contents.split_whitespace();
            let parsed = match (parts.next(), parts.next()) {
                (Some(hex), Some(recorded_size)) => Checksum::from_hex(hex)
                    .ok()
                    .zip(recorded_size.parse::<u64>().ok()),
                _ => None,
            };
            if let Some((checksum, recorded_size)) = parsed {
                if recorded_size == size {
                    return Ok(checksum);
                }
            }
        }

        let checksum = self.compute_checksum(name).await?;
        self.write_sidecar(name, &checksum, size).await;
        Ok(checksum)
    }

    /// Recompute a package's checksum by streaming its current bytes.
    async fn compute_checksum(&self, name: &str) -> StoreResult<Checksum> {
        let path = self.root.join(name);
        let mut file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;

        let mut hasher = Checksum::hasher();
        let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Build a record for a validated name from a fresh stat.
    async fn record(&self, name: &str, metadata: &std::fs::Metadata) -> StoreResult<PackageRecord> {
        let size = metadata.len();
        let modified_at = metadata.modified().map(Into::into).map_err(StoreError::Io)?;
        let checksum = self.load_checksum(name, size).await?;
        Ok(PackageRecord {
            name: name.to_string(),
            size,
            modified_at,
            checksum,
        })
    }
}

#[async_trait]
impl PackageStore for FilesystemStore {
    #[instrument(skip(self, stream), fields(backend = "filesystem"))]
    async fn save(
        &self,
        name: &str,
        mut stream: ByteStream,
        overwrite: bool,
    ) -> StoreResult<PackageRecord> {
        let path = self.package_path(name)?;

        if !overwrite && fs::try_exists(&path).await? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        // Stream into a uniquely-named temp file in the same directory, so
        // the final rename stays on one filesystem and is atomic.
        let temp = TempGuard::new(self.temp_path());
        let mut hasher = Checksum::hasher();
        let mut size: u64 = 0;
        {
            let mut file = fs::File::create(temp.path()).await?;
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                hasher.update(&chunk);
                size += chunk.len() as u64;
                file.write_all(&chunk).await?;
            }
            // Flush to disk before the rename makes the file visible.
            file.sync_all().await?;
        }
        let checksum = hasher.finalize();

        fs::rename(temp.path(), &path).await?;
        temp.disarm();

        self.write_sidecar(name, &checksum, size).await;

        let metadata = fs::metadata(&path).await?;
        let modified_at = metadata.modified().map(Into::into).map_err(StoreError::Io)?;
        Ok(PackageRecord {
            name: name.to_string(),
            size: metadata.len(),
            modified_at,
            checksum,
        })
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn open(&self, name: &str) -> StoreResult<ByteStream> {
        let path = self.package_path(name)?;
        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;

        let stream = async_stream::try_stream! {
            let mut file = file;
            let mut buf = vec![0u8; STREAM_CHUNK_SIZE];
            loop {
                let n = file.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                yield bytes::Bytes::copy_from_slice(&buf[..n]);
            }
        };

        Ok(Box::pin(stream))
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn stat(&self, name: &str) -> StoreResult<PackageRecord> {
        let path = self.package_path(name)?;
        let metadata = fs::metadata(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(name.to_string())
            } else {
                StoreError::Io(e)
            }
        })?;
        self.record(name, &metadata).await
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, name: &str) -> StoreResult<bool> {
        let path = self.package_path(name)?;
        fs::try_exists(&path).await.map_err(StoreError::Io)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, name: &str) -> StoreResult<bool> {
        // Unlink-while-open keeps an in-flight download readable from the
        // removed inode on POSIX filesystems; behavior elsewhere is
        // platform-dependent.
        let path = self.package_path(name)?;
        let deleted = match fs::remove_file(&path).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(StoreError::Io(e)),
        };
        // An orphaned sidecar is harmless but pointless; clean it up too.
        let _ = fs::remove_file(self.sidecar_path(name)).await;
        Ok(deleted)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self) -> StoreResult<Vec<PackageRecord>> {
        let mut records = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            // file_type() does not follow symlinks; links into or out of
            // the store directory are never listed.
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            let file_name = entry.file_name();
            let name = match file_name.to_str() {
                Some(name) => name,
                None => {
                    tracing::warn!(?file_name, "skipping non-UTF-8 file name in store");
                    continue;
                }
            };
            if name.starts_with('.') {
                continue;
            }
            // A file deleted between read_dir and stat is simply no longer
            // part of the listing.
            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::Io(e)),
            };
            match self.record(name, &metadata).await {
                Ok(record) => records.push(record),
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StoreResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StoreError::Io(std::io::Error::new(
                e.kind(),
                format!("store root not accessible: {e}"),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StoreError::Io(std::io::Error::other(format!(
                "store root is not a directory: {:?}",
                self.root
            ))));
        }

        Ok(())
    }
}
