//! Integration tests for retention enforcement through the HTTP surface.

mod common;

use common::server::{TEST_TOKEN, TestServer};
use std::time::Duration;

/// Small gap between uploads so filesystem modification times order them.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn names(listing: &[serde_json::Value]) -> Vec<String> {
    let mut names: Vec<String> = listing
        .iter()
        .map(|v| v["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_oldest_package_evicted_past_ceiling() {
    let server = TestServer::with_config(|config| {
        config.retention.max_packages = 3;
    })
    .await;

    for name in ["a.zip", "b.zip", "c.zip", "d.zip"] {
        server.upload_ok(name, b"content").await;
        settle().await;
    }

    let listing = server.list().await;
    assert_eq!(listing.len(), 3);
    assert_eq!(names(&listing), vec!["b.zip", "c.zip", "d.zip"]);
}

#[tokio::test]
async fn test_ceiling_holds_after_every_upload() {
    let server = TestServer::with_config(|config| {
        config.retention.max_packages = 3;
    })
    .await;

    for i in 0..6 {
        server.upload_ok(&format!("pkg-{i}.zip"), b"content").await;
        // Retention runs before the upload response, so the ceiling
        // already holds here.
        assert!(server.list().await.len() <= 3);
        settle().await;
    }

    assert_eq!(
        names(&server.list().await),
        vec!["pkg-3.zip", "pkg-4.zip", "pkg-5.zip"]
    );
}

#[tokio::test]
async fn test_exactly_one_eviction_at_ceiling_plus_one() {
    let server = TestServer::with_config(|config| {
        config.retention.max_packages = 5;
    })
    .await;

    for i in 0..5 {
        server.upload_ok(&format!("seed-{i}.zip"), b"content").await;
        settle().await;
    }
    assert_eq!(server.list().await.len(), 5);

    server.upload_ok("newcomer.zip", b"content").await;

    let listing = server.list().await;
    assert_eq!(listing.len(), 5);
    // The single evicted package is the oldest of the original five.
    assert_eq!(
        names(&listing),
        vec![
            "newcomer.zip",
            "seed-1.zip",
            "seed-2.zip",
            "seed-3.zip",
            "seed-4.zip"
        ]
    );
}

#[tokio::test]
async fn test_overwrite_refreshes_retention_age() {
    let server = TestServer::with_config(|config| {
        config.retention.max_packages = 2;
    })
    .await;

    server.upload_ok("a.zip", b"1").await;
    settle().await;
    server.upload_ok("b.zip", b"2").await;
    settle().await;

    // Touching a.zip makes b.zip the oldest.
    let (status, _) = server.upload("a.zip", b"1v2", true, Some(TEST_TOKEN)).await;
    assert_eq!(status, axum::http::StatusCode::OK);
    settle().await;

    server.upload_ok("c.zip", b"3").await;

    assert_eq!(names(&server.list().await), vec!["a.zip", "c.zip"]);
}

#[tokio::test]
async fn test_failed_upload_does_not_trigger_eviction() {
    let server = TestServer::with_config(|config| {
        config.retention.max_packages = 2;
    })
    .await;

    server.upload_ok("a.zip", b"1").await;
    settle().await;
    server.upload_ok("b.zip", b"2").await;
    settle().await;

    // A conflicting upload is rejected before any write, so the store is
    // exactly as it was.
    let (status, _) = server.upload("a.zip", b"other", false, Some(TEST_TOKEN)).await;
    assert_eq!(status, axum::http::StatusCode::CONFLICT);
    assert_eq!(names(&server.list().await), vec!["a.zip", "b.zip"]);
}
