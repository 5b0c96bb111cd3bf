//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted upload body size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// When enabled, restrict this endpoint to authorized scraper IPs at the
    /// infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_upload_bytes() -> usize {
    1024 * 1024 * 1024 // 1 GiB
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_upload_bytes == 0 {
            return Err("server.max_upload_bytes cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the package files.
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/packages")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Retention policy configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Maximum number of packages kept at rest. Once a write pushes the
    /// store past this ceiling, the globally-oldest packages are evicted.
    #[serde(default = "default_max_packages")]
    pub max_packages: usize,
}

fn default_max_packages() -> usize {
    10
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_packages: default_max_packages(),
        }
    }
}

impl RetentionConfig {
    /// Validate retention configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_packages == 0 {
            return Err(
                "retention.max_packages cannot be 0: every upload would be evicted immediately"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Upload token configuration.
///
/// Write operations (upload, delete) require a bearer token whose SHA-256
/// hash matches `token_hash`. Only the hash is ever stored or configured.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Pre-computed hash of the bearer token (SHA-256 hex, 64 characters).
    /// Generate with: `echo -n "your-secret-token" | sha256sum`
    pub token_hash: String,
}

impl AuthConfig {
    /// Create a test configuration with a dummy token hash.
    ///
    /// **For testing only.** The hash is the SHA-256 of "test-upload-token".
    pub fn for_testing() -> Self {
        Self {
            token_hash: "38d3354f54fb6756e59f735cc2ef6f71e5b4d3f85382190722ca28b328352b3c"
                .to_string(),
        }
    }

    /// Validate auth configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.token_hash.len() != 64 || !self.token_hash.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(
                "auth.token_hash must be a 64-character SHA-256 hex digest".to_string(),
            );
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Retention policy configuration.
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Upload token configuration (required).
    pub auth: AuthConfig,
}

impl AppConfig {
    /// Create a test configuration with sensible defaults.
    ///
    /// **For testing only.** Uses the default storage path and a dummy
    /// upload token.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            retention: RetentionConfig::default(),
            auth: AuthConfig::for_testing(),
        }
    }

    /// Validate the whole configuration, returning the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        self.server.validate()?;
        self.retention.validate()?;
        self.auth.validate()?;
        Ok(())
    }
}
