use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{archive, scan, system},
    infra::app_state::AppState,
};

/// Route paths shared by the router and its tests.
pub mod paths {
    pub const TEST: &str = "/test";
    pub const STATUS: &str = "/status";
    pub const START_SCAN: &str = "/start_scan";
    pub const STOP_SCAN: &str = "/stop_scan";
    pub const SCANS: &str = "/scans";
    pub const SCAN: &str = "/scans/{name}";

    pub fn scan(name: &str) -> String {
        SCAN.replace("{name}", name)
    }
}

/// Build the full application with middleware and state applied.
pub fn create_app(state: AppState) -> Router {
    create_router()
        // The scanner app is served from another origin
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route(paths::TEST, get(system::test_connection_handler))
        .route(paths::STATUS, get(scan::status_handler))
        .route(paths::START_SCAN, post(scan::start_scan_handler))
        .route(paths::STOP_SCAN, post(scan::stop_scan_handler))
        .route(paths::SCANS, get(archive::list_scans_handler))
        .route(paths::SCAN, get(archive::get_scan_handler))
}
