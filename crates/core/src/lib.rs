//! Core domain types shared across the shelf workspace.
//!
//! This crate defines the canonical data model used by the storage backend,
//! the HTTP server, and the tests:
//! - Content checksums and incremental hashing
//! - Package records (the unit the store manages)
//! - Configuration types with defaults and validation

pub mod config;
pub mod error;
pub mod hash;
pub mod package;

pub use error::{Error, Result};
pub use hash::{Checksum, ChecksumHasher};
pub use package::PackageRecord;

/// Chunk size used for streaming file reads (64 KiB).
pub const STREAM_CHUNK_SIZE: usize = 64 * 1024;
