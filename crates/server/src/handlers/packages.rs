//! Package endpoints: upload, listing, latest-release metadata, download,
//! and delete.

use crate::auth::Authenticated;
use crate::error::{ApiError, ApiResult};
use crate::metrics::{
    BYTES_UPLOADED, PACKAGES_DELETED, PACKAGES_EVICTED, PACKAGES_UPLOADED, UPLOAD_CONFLICTS,
    UPLOAD_DURATION,
};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, Request, State};
use axum::http::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, HOST};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{Extension, Json};
use futures::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use shelf_core::PackageRecord;
use shelf_storage::{ByteStream, StoreError};
use std::time::Instant;
use time::macros::format_description;

/// Query parameters for uploads.
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Replace an existing package of the same name.
    #[serde(default)]
    pub overwrite: bool,
}

/// PUT /assets/{filename} - Store an uploaded package.
///
/// The raw request body streams straight into the store; the response is
/// only produced after the retention pass has completed, so a successful
/// upload is proof the ceiling holds.
pub async fn upload_package(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Query(params): Query<UploadParams>,
    Extension(auth): Extension<Authenticated>,
    req: Request,
) -> ApiResult<Json<PackageRecord>> {
    auth.require()?;
    let start = Instant::now();

    let mut body = req.into_body().into_data_stream();

    // Reject empty payloads before the store is touched at all.
    let first = loop {
        match body.next().await {
            Some(Ok(chunk)) if chunk.is_empty() => continue,
            Some(Ok(chunk)) => break Some(chunk),
            Some(Err(e)) => {
                return Err(ApiError::BadRequest(format!(
                    "failed to read upload body: {e}"
                )));
            }
            None => break None,
        }
    };
    let Some(first) = first else {
        return Err(ApiError::BadRequest("empty file content".to_string()));
    };

    let rest = body.map_err(std::io::Error::other);
    let stream: ByteStream = Box::pin(futures::stream::iter(vec![Ok(first)]).chain(rest));

    let outcome = state
        .service
        .upload(&filename, stream, params.overwrite)
        .await
        .map_err(|e| {
            if matches!(e, StoreError::AlreadyExists(_)) {
                UPLOAD_CONFLICTS.inc();
            }
            ApiError::from(e)
        })?;

    PACKAGES_UPLOADED.inc();
    BYTES_UPLOADED.inc_by(outcome.record.size);
    if !outcome.evicted.is_empty() {
        PACKAGES_EVICTED.inc_by(outcome.evicted.len() as u64);
        tracing::info!(
            name = %outcome.record.name,
            evicted = ?outcome.evicted,
            "retention evicted packages after upload"
        );
    }
    UPLOAD_DURATION.observe(start.elapsed().as_secs_f64());

    tracing::info!(
        name = %outcome.record.name,
        size = outcome.record.size,
        checksum = %outcome.record.checksum,
        "package stored"
    );
    Ok(Json(outcome.record))
}

/// GET /assets/{filename} - Stream a package back to the client.
pub async fn download_asset(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> ApiResult<Response> {
    let (record, stream) = state.service.open_package(&filename).await?;

    let headers = [
        (CONTENT_TYPE, "application/octet-stream".to_string()),
        (CONTENT_LENGTH, record.size.to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", record.name),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// DELETE /assets/{filename} - Remove a package.
pub async fn delete_package(
    State(state): State<AppState>,
    Path(filename): Path<String>,
    Extension(auth): Extension<Authenticated>,
) -> ApiResult<StatusCode> {
    auth.require()?;

    if state.service.delete_package(&filename).await? {
        PACKAGES_DELETED.inc();
        tracing::info!(name = %filename, "package deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("package not found: {filename}")))
    }
}

/// One downloadable asset in a release descriptor.
#[derive(Debug, Serialize)]
pub struct Asset {
    pub name: String,
    pub size: u64,
    pub browser_download_url: String,
}

/// GitHub-compatible release descriptor for the latest package.
#[derive(Debug, Serialize)]
pub struct Release {
    pub tag_name: String,
    pub assets: Vec<Asset>,
}

/// GET /latest - Release metadata for the most-recently-uploaded package.
pub async fn get_latest_release(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Release>> {
    let record = state.service.get_latest().await?;
    let base = base_url(&headers);

    Ok(Json(Release {
        tag_name: "latest".to_string(),
        assets: vec![Asset {
            browser_download_url: format!("{base}{}", record.download_path()),
            name: record.name,
            size: record.size,
        }],
    }))
}

/// Presentation format for the listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    Json,
    Html,
}

/// Query parameters for listings.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    /// Explicit format; takes precedence over the Accept header.
    pub format: Option<ListFormat>,
}

/// GET /packages - List packages, newest first.
///
/// Content negotiation: `?format=json|html` wins over the Accept header;
/// `Accept: text/html` yields a simple HTML index, everything else JSON.
pub async fn list_packages(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let records = state.service.list_packages().await?;

    let want_html = match params.format {
        Some(ListFormat::Html) => true,
        Some(ListFormat::Json) => false,
        None => headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html")),
    };

    if want_html {
        Ok(Html(render_listing(&records, &base_url(&headers))).into_response())
    } else {
        Ok(Json(records).into_response())
    }
}

/// Derive the externally-visible base URL from request headers.
fn base_url(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

/// Minimal HTML escaping for text and attribute positions.
fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the HTML package index.
fn render_listing(records: &[PackageRecord], base_url: &str) -> String {
    let mut page = String::from(
        "<!DOCTYPE html>\n<html>\n<head>\n<title>Shelf Packages</title>\n<style>\n\
         body { font-family: sans-serif; max-width: 800px; margin: 2rem auto; padding: 0 1rem; }\n\
         ul { list-style: none; padding: 0; }\n\
         li { padding: 0.5rem; border-bottom: 1px solid #eee; display: flex; justify-content: space-between; }\n\
         a { text-decoration: none; color: #0366d6; font-weight: bold; }\n\
         .meta { color: #666; font-size: 0.9em; }\n\
         </style>\n</head>\n<body>\n<h1>Available Packages</h1>\n<ul>\n",
    );

    if records.is_empty() {
        page.push_str("<li>No packages found.</li>\n");
    }

    let timestamp = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    for record in records {
        let name = escape_html(&record.name);
        let date = record
            .modified_at
            .format(&timestamp)
            .unwrap_or_else(|_| record.modified_at.to_string());
        page.push_str(&format!(
            "<li><a href=\"{base}{path}\">{name}</a> <span class=\"meta\">{size} bytes | {date}</span></li>\n",
            base = escape_html(base_url),
            path = escape_html(&record.download_path()),
            size = record.size,
        ));
    }

    page.push_str("</ul>\n</body>\n</html>\n");
    page
}
