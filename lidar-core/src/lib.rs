//! # Lidar Core
//!
//! Domain logic for the lidar scan control server.
//!
//! A single hardware scanner is driven by three external commands: one that
//! starts a scan, one that signals it to stop, and one that post-processes
//! the captured data into the archive directory. This crate owns the
//! lifecycle around those commands:
//!
//! - [`scan::StatusRegister`]: the process-wide phase, scan name, and
//!   running process handle
//! - [`scan::ScanLifecycleController`]: the `idle -> scanning -> processing
//!   -> idle` state machine
//! - [`scan::ProcessRunner`]: the capability used to launch commands, with a
//!   [`scan::TokioProcessRunner`] implementation for production
//! - [`archive::ScanArchive`]: listing and opening completed scan files, and
//!   disk usage of the archive filesystem
//!
//! ## Feature Flags
//!
//! - `test-utils`: exposes `scan::testing`, an in-memory process runner for
//!   driving the lifecycle without real scripts

#![allow(missing_docs)]

pub mod archive;
pub mod error;
pub mod scan;

pub use archive::{DiskUsageSnapshot, ScanArchive, ScanArtifact};
pub use error::{Result, ScanError};
pub use scan::{
    ProcessExit, ProcessRunner, ScanCommands, ScanLifecycleController,
    ScanPhase, ScanProcess, StatusRegister, StatusSnapshot, TokioProcessRunner,
};
