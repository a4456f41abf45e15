use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};
use lidar_core::{ScanArtifact, ScanError};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanListResponse {
    pub scans: Vec<ScanArtifact>,
}

pub async fn list_scans_handler(
    State(state): State<AppState>,
) -> AppResult<Json<ScanListResponse>> {
    info!("list scans request received");
    let scans = state.scans().archive().list().await?;
    info!(count = scans.len(), "found scans");
    Ok(Json(ScanListResponse { scans }))
}

/// Stream a finished scan as an attachment.
pub async fn get_scan_handler(
    State(state): State<AppState>,
    Path(scan_name): Path<String>,
) -> AppResult<Response> {
    info!(scan = %scan_name, "download request received");
    let (file, artifact) = match state.scans().archive().open(&scan_name).await
    {
        Ok(opened) => opened,
        Err(err @ ScanError::NotFound(_)) => {
            warn!(scan = %scan_name, "scan not found");
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(artifact.size));
    headers.insert(
        header::CONTENT_DISPOSITION,
        content_disposition(&artifact.name),
    );

    let stream = ReaderStream::new(file);
    Ok((headers, Body::from_stream(stream)).into_response())
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let escaped = file_name.replace('\\', "\\\\").replace('"', "\\\"");
    HeaderValue::from_bytes(
        format!("attachment; filename=\"{escaped}\"").as_bytes(),
    )
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
