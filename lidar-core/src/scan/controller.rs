use std::{fmt, io, path::Component, path::Path, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::{sync::Mutex as AsyncMutex, task::JoinHandle};
use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    archive::{DiskUsageSnapshot, ScanArchive},
    error::{Result, ScanError},
};

use super::{
    process::{ProcessRunner, ScanCommands, ScanProcess},
    register::{StatusRegister, StatusSnapshot},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStarted {
    pub scan_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStopping {
    pub scan_name: String,
}

/// Drives the scanner through `idle -> scanning -> processing -> idle`.
///
/// Start and stop are serialized by an async transition lock, so a stop that
/// is waiting on the scan process never races a start. The status register
/// has its own short-lived lock, which keeps status reads responsive while a
/// stop is in flight.
#[derive(Clone)]
pub struct ScanLifecycleController {
    inner: Arc<ControllerInner>,
}

impl fmt::Debug for ScanLifecycleController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let processing = self
            .inner
            .processing
            .try_lock()
            .map(|guard| guard.is_some());

        f.debug_struct("ScanLifecycleController")
            .field("status", &self.inner.register.snapshot())
            .field("commands", &self.inner.commands)
            .field("archive", &self.inner.archive)
            .field("processing_task", &processing)
            .finish()
    }
}

struct ControllerInner {
    register: StatusRegister,
    commands: ScanCommands,
    runner: Arc<dyn ProcessRunner>,
    archive: ScanArchive,
    transition: AsyncMutex<()>,
    processing: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

/// Resets the register to idle when the post-processing task ends, however
/// it ends.
struct ProcessingReset {
    inner: Arc<ControllerInner>,
    scan_name: String,
}

impl Drop for ProcessingReset {
    fn drop(&mut self) {
        self.inner.register.finish_processing();
        info!(scan = %self.scan_name, "scanner returned to idle");
    }
}

impl ScanLifecycleController {
    pub fn new(
        commands: ScanCommands,
        runner: Arc<dyn ProcessRunner>,
        archive: ScanArchive,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                register: StatusRegister::new(),
                commands,
                runner,
                archive,
                transition: AsyncMutex::new(()),
                processing: parking_lot::Mutex::new(None),
            }),
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        self.inner.register.snapshot()
    }

    pub fn archive(&self) -> &ScanArchive {
        &self.inner.archive
    }

    pub fn disk_usage(&self) -> Result<DiskUsageSnapshot> {
        self.inner.archive.disk_usage()
    }

    /// Launch the start command and return once it has been spawned.
    #[instrument(skip(self))]
    pub async fn start_scan(
        &self,
        name: Option<String>,
    ) -> Result<ScanStarted> {
        let scan_name = match name {
            Some(name) => validate_scan_name(name)?,
            None => default_scan_name(Utc::now()),
        };

        let _transition = self.inner.transition.lock().await;
        if let Err(err) = self.inner.register.begin_scan(&scan_name) {
            warn!(error = %err, "start refused");
            return Err(err);
        }

        let start = &self.inner.commands.start;
        info!(
            command = %start.display(),
            scan = %scan_name,
            "executing start command"
        );
        match self.inner.runner.spawn(start, &[scan_name.clone()]) {
            Ok(process) => {
                info!(pid = ?process.id(), scan = %scan_name, "scan started");
                self.inner.register.attach_process(process);
                Ok(ScanStarted { scan_name })
            }
            Err(err) => {
                self.inner.register.abort_scan();
                error!(error = %err, scan = %scan_name, "error starting scan");
                Err(ScanError::Launch(err))
            }
        }
    }

    /// Stop the running scan, wait for it to exit, and hand it to
    /// post-processing in the background.
    ///
    /// Blocks for as long as the scan process takes to exit after the stop
    /// command; there is no timeout. The sequence runs on its own task that
    /// owns the scan process, so it still completes when the caller is
    /// dropped part-way through.
    #[instrument(skip(self))]
    pub async fn stop_scan(&self) -> Result<ScanStopping> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(inner.stop_sequence().in_current_span());

        match task.await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "stop task did not complete");
                Err(ScanError::Unexpected(io::Error::other(err.to_string())))
            }
        }
    }

    /// Wait for the post-processing task spawned by the last stop, if any.
    pub async fn wait_for_processing(&self) {
        let handle = self.inner.processing.lock().take();
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            error!(error = %err, "post-processing task did not complete");
        }
    }
}

impl ControllerInner {
    async fn stop_sequence(self: Arc<Self>) -> Result<ScanStopping> {
        let _transition = self.transition.lock().await;
        let (scan_name, mut process) = match self.register.take_for_stop() {
            Ok(taken) => taken,
            Err(err) => {
                warn!(error = %err, "stop refused");
                return Err(err);
            }
        };

        if let Err(err) = self.halt_scan_process(process.as_mut()).await {
            error!(error = %err, scan = %scan_name, "error stopping scan");
            self.register.restore_process(process);
            return Err(err.into());
        }
        drop(process);

        self.register.begin_processing();
        self.spawn_processing(scan_name.clone());

        Ok(ScanStopping { scan_name })
    }

    async fn halt_scan_process(
        &self,
        process: Option<&mut Box<dyn ScanProcess>>,
    ) -> io::Result<()> {
        let Some(process) = process else {
            return Ok(());
        };

        if let Some(exit) = process.try_wait()? {
            info!(%exit, "scan process had already exited");
            return Ok(());
        }

        let stop = &self.commands.stop;
        info!(command = %stop.display(), "signalling scan to stop");
        let exit = self.runner.run(stop, &[]).await?;
        if !exit.success() {
            warn!(%exit, "stop command reported failure");
        }

        let exit = process.wait().await?;
        info!(%exit, "scan process exited");
        Ok(())
    }

    fn spawn_processing(self: &Arc<Self>, scan_name: String) {
        let reset = ProcessingReset {
            inner: Arc::clone(self),
            scan_name: scan_name.clone(),
        };
        let runner = Arc::clone(&self.runner);
        let command = self.commands.process.clone();

        let handle = tokio::spawn(async move {
            let _reset = reset;
            info!(scan = %scan_name, "processing scan");
            match runner.run(&command, &[scan_name.clone()]).await {
                Ok(exit) if exit.success() => {
                    info!(scan = %scan_name, "scan processing complete");
                }
                Ok(exit) => {
                    warn!(%exit, scan = %scan_name, "scan processing failed");
                }
                Err(err) => {
                    error!(
                        error = %err,
                        scan = %scan_name,
                        "error processing scan"
                    );
                }
            }
        });

        *self.processing.lock() = Some(handle);
    }
}

/// `scan_<unix seconds>`, used when the caller does not name the scan.
pub fn default_scan_name(now: DateTime<Utc>) -> String {
    format!("scan_{}", now.timestamp())
}

/// Scan names are handed to scripts that write `<name>.*` into the archive,
/// so they must be a single plain path component.
fn validate_scan_name(name: String) -> Result<String> {
    if name.trim().is_empty() || name.contains('\0') || name.contains('\\') {
        return Err(ScanError::InvalidScanName(name));
    }

    let mut components = Path::new(&name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == name.as_str() => {
            Ok(name)
        }
        _ => Err(ScanError::InvalidScanName(name)),
    }
}
