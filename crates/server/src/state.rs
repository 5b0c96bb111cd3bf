//! Application state shared across handlers.

use crate::service::PackageService;
use shelf_core::config::AppConfig;
use shelf_storage::PackageStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Package service orchestrating the store.
    pub service: Arc<PackageService>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Panics
    ///
    /// Panics if configuration validation fails; startup code validates
    /// before building routes, so this only trips on programming errors.
    pub fn new(config: AppConfig, store: Arc<dyn PackageStore>) -> Self {
        if let Err(error) = config.validate() {
            panic!("invalid configuration: {error}");
        }

        let service = Arc::new(PackageService::new(store, config.retention.max_packages));

        Self {
            config: Arc::new(config),
            service,
        }
    }
}
