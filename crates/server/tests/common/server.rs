//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use shelf_core::config::AppConfig;
use shelf_server::{AppState, create_router};
use shelf_storage::{FilesystemStore, PackageStore};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// The raw token matching `AuthConfig::for_testing`.
#[allow(dead_code)]
pub const TEST_TOKEN: &str = "test-upload-token";

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub storage_path: PathBuf,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server with temporary storage.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let storage_path = temp_dir.path().join("packages");

        let store: Arc<dyn PackageStore> = Arc::new(
            FilesystemStore::new(&storage_path)
                .await
                .expect("Failed to create package store"),
        );

        let mut config = AppConfig::for_testing();
        config.storage.path = storage_path.clone();
        modifier(&mut config);

        let state = AppState::new(config, store);
        let router = create_router(state.clone());

        Self {
            router,
            state,
            storage_path,
            _temp_dir: temp_dir,
        }
    }

    /// Upload a package via the HTTP surface, returning status and body.
    pub async fn upload(
        &self,
        name: &str,
        content: &[u8],
        overwrite: bool,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let uri = if overwrite {
            format!("/assets/{name}?overwrite=true")
        } else {
            format!("/assets/{name}")
        };

        let mut builder = Request::builder().method("PUT").uri(uri);
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(content.to_vec())).unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = body_json(response).await;
        (status, body)
    }

    /// Convenience upload with the valid test token.
    pub async fn upload_ok(&self, name: &str, content: &[u8]) -> Value {
        let (status, body) = self.upload(name, content, false, Some(TEST_TOKEN)).await;
        assert_eq!(status, StatusCode::OK, "upload failed: {body}");
        body
    }

    /// Fetch the JSON package listing.
    pub async fn list(&self) -> Vec<Value> {
        let (status, body) = self.get_json("/packages").await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().cloned().expect("listing is a JSON array")
    }

    /// GET a path and decode the body as JSON.
    pub async fn get_json(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = body_json(response).await;
        (status, body)
    }

    /// GET a path and return the raw body bytes.
    pub async fn get_bytes(&self, uri: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    /// DELETE a package via the HTTP surface.
    pub async fn delete(&self, name: &str, token: Option<&str>) -> StatusCode {
        let mut builder = Request::builder()
            .method("DELETE")
            .uri(format!("/assets/{name}"));
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty()).unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        response.status()
    }
}

/// Decode a response body as JSON, or Null when empty/non-JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}
