//! Scan lifecycle: status register, controller, and external process
//! capability.

mod controller;
mod process;
mod register;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use controller::{
    ScanLifecycleController, ScanStarted, ScanStopping, default_scan_name,
};
pub use process::{
    ProcessExit, ProcessRunner, ScanCommands, ScanProcess, TokioProcessRunner,
};
pub use register::{ScanPhase, StatusRegister, StatusSnapshot};
