use std::fmt;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScanError};

use super::process::ScanProcess;

const SCANNER_BUSY: &str = "Scanner already in use";
const NO_ACTIVE_SCAN: &str = "No active scan to stop";

/// Lifecycle phase of the single scanner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    #[default]
    Idle,
    Scanning,
    Processing,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Scanning => "scanning",
            ScanPhase::Processing => "processing",
        }
    }

    /// Scanning or processing; at most one session is ever active.
    pub fn is_active(&self) -> bool {
        !matches!(self, ScanPhase::Idle)
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consistent copy of the register taken under its lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub phase: ScanPhase,
    pub current_scan: Option<String>,
}

#[derive(Debug, Default)]
struct RegisterState {
    phase: ScanPhase,
    scan_name: Option<String>,
    process: Option<Box<dyn ScanProcess>>,
}

/// Process-wide scanner status.
///
/// Every read and write goes through one mutex and no guard ever escapes
/// this type, so callers only see whole transitions. Legality of the
/// transitions is decided here with compare-and-set helpers; sequencing of
/// the external commands around them belongs to
/// [`ScanLifecycleController`](super::ScanLifecycleController).
#[derive(Debug, Default)]
pub struct StatusRegister {
    state: Mutex<RegisterState>,
}

impl StatusRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.lock();
        StatusSnapshot {
            phase: state.phase,
            current_scan: state.scan_name.clone(),
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.state.lock().phase
    }

    /// `Idle -> Scanning`, recording the scan name.
    pub(crate) fn begin_scan(&self, scan_name: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.phase != ScanPhase::Idle {
            return Err(ScanError::conflict(SCANNER_BUSY));
        }
        state.phase = ScanPhase::Scanning;
        state.scan_name = Some(scan_name.to_string());
        state.process = None;
        Ok(())
    }

    pub(crate) fn attach_process(&self, process: Box<dyn ScanProcess>) {
        self.state.lock().process = Some(process);
    }

    /// Undo [`begin_scan`](Self::begin_scan) after a failed launch.
    pub(crate) fn abort_scan(&self) {
        let mut state = self.state.lock();
        state.phase = ScanPhase::Idle;
        state.scan_name = None;
        state.process = None;
    }

    /// Take ownership of the scan process so it can be stopped without
    /// holding the lock. The phase stays `Scanning`.
    pub(crate) fn take_for_stop(
        &self,
    ) -> Result<(String, Option<Box<dyn ScanProcess>>)> {
        let mut state = self.state.lock();
        if state.phase != ScanPhase::Scanning {
            return Err(ScanError::conflict(NO_ACTIVE_SCAN));
        }
        let scan_name = state.scan_name.clone().unwrap_or_default();
        Ok((scan_name, state.process.take()))
    }

    pub(crate) fn restore_process(
        &self,
        process: Option<Box<dyn ScanProcess>>,
    ) {
        let mut state = self.state.lock();
        if state.phase == ScanPhase::Scanning && state.process.is_none() {
            state.process = process;
        }
    }

    /// `Scanning -> Processing`. The scan process has exited at this point.
    pub(crate) fn begin_processing(&self) {
        let mut state = self.state.lock();
        state.phase = ScanPhase::Processing;
        state.process = None;
    }

    /// `Processing -> Idle`. The last scan name stays visible.
    pub(crate) fn finish_processing(&self) {
        let mut state = self.state.lock();
        if state.phase == ScanPhase::Processing {
            state.phase = ScanPhase::Idle;
        }
    }
}
