use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Result, anyhow};
use axum_test::TestServer;
#[allow(unused_imports)]
pub use lidar_core::scan::testing::{FakeRunner, PROCESS, START, STOP};
use lidar_core::scan::testing::fake_commands;
use lidar_server::{AppState, create_app, infra::config::Config};
use tempfile::TempDir;

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub runner: FakeRunner,
    scan_dir: TempDir,
}

#[allow(unused)]
impl TestApp {
    pub fn scan_dir(&self) -> &Path {
        self.scan_dir.path()
    }

    pub fn write_file(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.scan_dir.path().join(name);
        std::fs::write(&path, contents).expect("write fixture file");
        path
    }

    pub async fn wait_for_idle(&self) {
        tokio::time::timeout(
            Duration::from_secs(5),
            self.state.scans().wait_for_processing(),
        )
        .await
        .expect("post-processing should finish");
    }
}

pub fn test_config(scan_dir: &Path) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        scan_dir: scan_dir.to_path_buf(),
        scan_extension: "pcd".to_string(),
        commands: fake_commands(),
        log_file: None,
    }
}

#[allow(unused)]
pub fn build_test_app(runner: FakeRunner) -> Result<TestApp> {
    let scan_dir = TempDir::new()?;
    let state = AppState::new(
        &test_config(scan_dir.path()),
        Arc::new(runner.clone()),
    );
    let server = TestServer::builder()
        .build(create_app(state.clone()))
        .map_err(|err| anyhow!(err.to_string()))?;

    Ok(TestApp {
        server,
        state,
        runner,
        scan_dir,
    })
}
