//! Route configuration.

use crate::auth::auth_middleware;
use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        // Release metadata for installers
        .route("/latest", get(handlers::get_latest_release))
        // Listing with JSON/HTML negotiation
        .route("/packages", get(handlers::list_packages))
        // Download is public; upload and delete require the write token
        .route(
            "/assets/{filename}",
            get(handlers::download_asset)
                .put(handlers::upload_package)
                .delete(handlers::delete_package),
        )
        // Health endpoints (intentionally unauthenticated for probes)
        .route("/health", get(handlers::health_check))
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz));

    // Conditionally expose metrics. When enabled, restrict this endpoint to
    // authorized Prometheus scraper IPs at the infrastructure level.
    if state.config.server.metrics_enabled {
        router = router.route("/metrics", get(metrics_handler));
    }

    // Middleware layers are applied in reverse order (outermost first).
    // Order of execution: TraceLayer -> body limit -> auth -> handler.
    router
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(state.config.server.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
