use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Connectivity probe used by the scanner app before it issues commands.
pub async fn test_connection_handler() -> Json<MessageResponse> {
    info!("connection test requested");
    Json(MessageResponse {
        message: "Connected successfully".to_string(),
    })
}
