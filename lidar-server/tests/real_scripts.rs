//! End-to-end cycle against real shell scripts. Kept as the only test in
//! this binary so no other test forks while the scripts are being written.
#![cfg(unix)]

use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, anyhow};
use axum_test::TestServer;
use lidar_core::{ScanCommands, ScanPhase, TokioProcessRunner};
use lidar_server::{
    AppState, create_app, handlers::archive::ScanListResponse,
    infra::config::Config, routes::paths,
};
use serde_json::json;
use tempfile::TempDir;

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    let mut permissions = std::fs::metadata(&path)?.permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&path, permissions)?;
    Ok(path)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scripts_drive_a_complete_scan() -> Result<()> {
    let workdir = TempDir::new()?;
    let scan_dir = workdir.path().join("scans");
    std::fs::create_dir(&scan_dir)?;
    let stop_flag = workdir.path().join("stop.flag");

    let start = write_script(
        workdir.path(),
        "start_scan.sh",
        &format!(
            "while [ ! -f '{flag}' ]; do sleep 0.05; done",
            flag = stop_flag.display()
        ),
    )?;
    let stop = write_script(
        workdir.path(),
        "stop_scan.sh",
        &format!("touch '{}'", stop_flag.display()),
    )?;
    let process = write_script(
        workdir.path(),
        "process_scan.sh",
        &format!("printf 'points' > '{}/'\"$1\".pcd", scan_dir.display()),
    )?;

    let config = Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        scan_dir: scan_dir.clone(),
        scan_extension: "pcd".to_string(),
        commands: ScanCommands {
            start,
            stop,
            process,
        },
        log_file: None,
    };
    let state = AppState::new(&config, Arc::new(TokioProcessRunner));
    let server = TestServer::builder()
        .build(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    server
        .post(paths::START_SCAN)
        .json(&json!({ "name": "porch" }))
        .await
        .assert_status_ok();
    assert_eq!(state.scans().status().phase, ScanPhase::Scanning);

    server.post(paths::STOP_SCAN).await.assert_status_ok();
    tokio::time::timeout(
        Duration::from_secs(10),
        state.scans().wait_for_processing(),
    )
    .await?;
    assert_eq!(state.scans().status().phase, ScanPhase::Idle);

    let listing: ScanListResponse = server.get(paths::SCANS).await.json();
    assert_eq!(listing.scans.len(), 1);
    assert_eq!(listing.scans[0].name, "porch.pcd");

    let download = server.get(&paths::scan("porch.pcd")).await;
    download.assert_status_ok();
    assert_eq!(download.text(), "points");
    Ok(())
}
