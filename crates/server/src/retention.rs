//! Retention policy: keep the store at or under a package-count ceiling.

use shelf_storage::{PackageStore, StoreResult};
use std::sync::Arc;
use tracing::instrument;

/// Evicts the globally-oldest packages once the store exceeds a configured
/// ceiling. Retention is global: all packages compete for the same slots,
/// with no per-name quotas.
///
/// The policy never touches the filesystem itself; it works entirely
/// through the store's `list` and `delete` operations.
pub struct RetentionPolicy {
    store: Arc<dyn PackageStore>,
}

impl RetentionPolicy {
    /// Create a new retention policy over the given store.
    pub fn new(store: Arc<dyn PackageStore>) -> Self {
        Self { store }
    }

    /// Enforce the ceiling, returning the names actually evicted.
    ///
    /// Packages are ordered by modification time ascending, ties broken by
    /// name ascending, and the oldest `count - max_packages` are deleted.
    /// A delete that fails or finds the file already gone is logged and
    /// skipped; the pass continues with the remaining victims.
    #[instrument(skip(self))]
    pub async fn enforce(&self, max_packages: usize) -> StoreResult<Vec<String>> {
        let mut records = self.store.list().await?;
        if records.len() <= max_packages {
            return Ok(Vec::new());
        }

        records.sort_by(|a, b| {
            a.modified_at
                .cmp(&b.modified_at)
                .then_with(|| a.name.cmp(&b.name))
        });

        let excess = records.len() - max_packages;
        let mut evicted = Vec::with_capacity(excess);
        for record in records.into_iter().take(excess) {
            match self.store.delete(&record.name).await {
                Ok(true) => {
                    tracing::info!(name = %record.name, "evicted package over retention ceiling");
                    evicted.push(record.name);
                }
                Ok(false) => {
                    tracing::debug!(name = %record.name, "eviction target already gone");
                }
                Err(e) => {
                    tracing::warn!(name = %record.name, error = %e, "failed to evict package, continuing");
                }
            }
        }

        Ok(evicted)
    }
}
