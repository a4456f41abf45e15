use std::sync::Arc;

use lidar_core::{ProcessRunner, ScanLifecycleController};

use crate::infra::config::Config;

/// Shared handler state; every request goes through the one controller.
#[derive(Clone, Debug)]
pub struct AppState {
    pub scans: ScanLifecycleController,
}

impl AppState {
    pub fn new(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let scans = ScanLifecycleController::new(
            config.commands.clone(),
            runner,
            config.archive(),
        );
        Self { scans }
    }

    pub fn scans(&self) -> &ScanLifecycleController {
        &self.scans
    }
}
