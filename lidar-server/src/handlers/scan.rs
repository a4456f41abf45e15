use axum::{Json, body::Bytes, extract::State};
use lidar_core::{DiskUsageSnapshot, ScanPhase};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infra::{
    app_state::AppState,
    errors::{AppError, AppResult},
};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StartScanRequest {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: ScanPhase,
    pub current_scan: Option<String>,
    pub disk_space: DiskUsageSnapshot,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StartScanResponse {
    pub status: String,
    pub scan_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StopScanResponse {
    pub status: String,
    pub message: String,
}

pub async fn status_handler(
    State(state): State<AppState>,
) -> AppResult<Json<StatusResponse>> {
    info!("status request received");
    let snapshot = state.scans().status();
    let disk_space = state.scans().disk_usage()?;

    Ok(Json(StatusResponse {
        status: snapshot.phase,
        current_scan: snapshot.current_scan,
        disk_space,
    }))
}

/// `POST /start_scan`. The JSON body is optional; without a name the scan is
/// named after the current unix time.
pub async fn start_scan_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<StartScanResponse>> {
    info!("start scan request received");
    let request = parse_start_request(&body)?;

    let started = state.scans().start_scan(request.name).await?;

    Ok(Json(StartScanResponse {
        status: "started".to_string(),
        scan_name: started.scan_name,
    }))
}

pub async fn stop_scan_handler(
    State(state): State<AppState>,
) -> AppResult<Json<StopScanResponse>> {
    info!("stop scan request received");
    state.scans().stop_scan().await?;

    Ok(Json(StopScanResponse {
        status: "stopping".to_string(),
        message: "Scan stopped and processing".to_string(),
    }))
}

fn parse_start_request(body: &[u8]) -> AppResult<StartScanRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StartScanRequest::default());
    }
    serde_json::from_slice(body).map_err(|err| {
        AppError::bad_request(format!("Invalid start scan request: {err}"))
    })
}
