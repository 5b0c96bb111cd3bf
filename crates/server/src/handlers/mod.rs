//! HTTP request handlers.

pub mod health;
pub mod packages;

pub use health::{health_check, healthz, readyz};
pub use packages::{
    delete_package, download_asset, get_latest_release, list_packages, upload_package,
};
