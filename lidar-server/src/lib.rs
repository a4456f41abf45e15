//! # Lidar Server
//!
//! HTTP control plane for a single lidar scanner.
//!
//! ## Endpoints
//!
//! - `GET /test`: connectivity probe
//! - `GET /status`: scanner phase, current scan, and archive disk usage
//! - `POST /start_scan`: launch the start script with an optional name
//! - `POST /stop_scan`: stop the scan and post-process it in the background
//! - `GET /scans`: finished scans in the archive
//! - `GET /scans/{name}`: download a finished scan
//!
//! The scanner itself is driven by external scripts; see
//! [`lidar_core::ScanLifecycleController`] for the lifecycle rules.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;
pub use routes::create_app;
