//! Prometheus metrics for the shelf server.
//!
//! # Security Note
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus scraping.
//! It exposes aggregate usage only (counts, bytes, durations), but should
//! still be network-restricted to authorized scraper IPs at the
//! infrastructure level. It can be disabled with `server.metrics_enabled`.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static PACKAGES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shelf_packages_uploaded_total",
        "Total number of packages stored successfully",
    )
    .expect("metric creation failed")
});

pub static UPLOAD_CONFLICTS: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shelf_upload_conflicts_total",
        "Total number of uploads rejected because the name already existed",
    )
    .expect("metric creation failed")
});

pub static PACKAGES_EVICTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shelf_packages_evicted_total",
        "Total number of packages evicted by the retention policy",
    )
    .expect("metric creation failed")
});

pub static PACKAGES_DELETED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "shelf_packages_deleted_total",
        "Total number of packages removed by explicit delete requests",
    )
    .expect("metric creation failed")
});

pub static BYTES_UPLOADED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new("shelf_bytes_uploaded_total", "Total bytes stored").expect(
        "metric creation failed",
    )
});

pub static UPLOAD_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "shelf_upload_duration_seconds",
            "Time taken to persist an upload, including the retention pass",
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(PACKAGES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_CONFLICTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PACKAGES_EVICTED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(PACKAGES_DELETED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_UPLOADED.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(UPLOAD_DURATION.clone()))
            .expect("metric registration failed");
    });
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buffer) {
        tracing::error!(error = %e, "failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, String::new());
    }
    match String::from_utf8(buffer) {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "metrics output was not valid UTF-8");
            (StatusCode::INTERNAL_SERVER_ERROR, String::new())
        }
    }
}
