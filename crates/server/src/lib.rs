//! HTTP server for the shelf release server.
//!
//! This crate provides the HTTP control plane:
//! - Streaming package upload with synchronous retention enforcement
//! - Package listing and latest-release metadata
//! - Asset download streaming
//! - Bearer-token auth for write operations
//! - Health and metrics endpoints

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod retention;
pub mod routes;
pub mod service;
pub mod state;

#[cfg(test)]
mod testutil;

pub use auth::{Authenticated, TraceId};
pub use error::{ApiError, ApiResult};
pub use retention::RetentionPolicy;
pub use routes::create_router;
pub use service::{PackageService, UploadOutcome};
pub use state::AppState;
