use anyhow::Result;
use axum::http::StatusCode;
use lidar_server::{handlers::archive::ScanListResponse, routes::paths};
use serde_json::Value;

#[path = "support/mod.rs"]
mod support;

use support::{FakeRunner, build_test_app};

#[tokio::test]
async fn listing_ignores_other_extensions() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;
    app.write_file("a.pcd", &[0u8; 1024]);
    app.write_file("b.txt", b"notes");

    let response = app.server.get(paths::SCANS).await;

    response.assert_status_ok();
    let body: ScanListResponse = response.json();
    assert_eq!(body.scans.len(), 1);
    assert_eq!(body.scans[0].name, "a.pcd");
    assert_eq!(body.scans[0].size, 1024);
    Ok(())
}

#[tokio::test]
async fn listing_uses_unix_seconds_for_dates() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;
    app.write_file("room.pcd", b"points");

    let body: Value = app.server.get(paths::SCANS).await.json();

    let scan = &body["scans"][0];
    assert_eq!(scan["name"], "room.pcd");
    assert_eq!(scan["size"], 6);
    assert!(scan["date"].as_i64().is_some_and(|date| date > 0));
    Ok(())
}

#[tokio::test]
async fn empty_archive_lists_nothing() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;

    let body: ScanListResponse = app.server.get(paths::SCANS).await.json();

    assert!(body.scans.is_empty());
    Ok(())
}

#[tokio::test]
async fn download_streams_file_as_attachment() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;
    let contents: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
    app.write_file("garage.pcd", &contents);

    let response = app.server.get(&paths::scan("garage.pcd")).await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "application/octet-stream"
    );
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"garage.pcd\""
    );
    assert_eq!(response.header("content-length"), "4096");
    assert_eq!(response.as_bytes().as_ref(), contents.as_slice());
    Ok(())
}

#[tokio::test]
async fn missing_scan_is_not_found() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;

    let response = app.server.get(&paths::scan("nothing.pcd")).await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["message"], "Scan not found");
    Ok(())
}

#[tokio::test]
async fn traversal_outside_archive_is_not_found() -> Result<()> {
    let app = build_test_app(FakeRunner::new())?;
    app.write_file("inside.pcd", b"ok");

    for path in [
        "/scans/..%2F..%2Fetc%2Fpasswd",
        "/scans/..%2Finside.pcd",
        "/scans/sub%2Finside.pcd",
        "/scans/%2Fetc%2Fpasswd",
        "/scans/..",
    ] {
        let response = app.server.get(path).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    app.server
        .get(&paths::scan("inside.pcd"))
        .await
        .assert_status_ok();
    Ok(())
}
