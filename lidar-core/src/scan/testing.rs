//! Test doubles for the scanner scripts. Compiled for this crate's own tests
//! and, with the `test-utils` feature, for downstream integration tests.

use std::{
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use super::{ProcessExit, ProcessRunner, ScanCommands, ScanProcess};

pub const START: &str = "start_scan.sh";
pub const STOP: &str = "stop_scan.sh";
pub const PROCESS: &str = "process_scan.sh";

pub fn fake_commands() -> ScanCommands {
    ScanCommands {
        start: PathBuf::from(START),
        stop: PathBuf::from(STOP),
        process: PathBuf::from(PROCESS),
    }
}

/// In-memory stand-in for the scanner scripts.
///
/// Commands are matched against [`fake_commands`] by path.
///
/// The fake scan process runs until the stop command is invoked (or
/// [`finish_scan`](Self::finish_scan) is called). When gated, the process
/// command blocks until [`release_processing`](Self::release_processing).
#[derive(Debug, Clone)]
pub struct FakeRunner {
    inner: Arc<FakeRunnerInner>,
}

#[derive(Debug)]
struct FakeRunnerInner {
    invocations: Mutex<Vec<(String, Vec<String>)>>,
    scan_exited: Arc<AtomicBool>,
    fail_spawn: AtomicBool,
    fail_stop: AtomicBool,
    hold_scan: AtomicBool,
    fail_process: AtomicBool,
    process_exit: AtomicI32,
    gated: bool,
    gate: Semaphore,
}

#[derive(Debug)]
struct FakeScanProcess {
    exited: Arc<AtomicBool>,
}

#[async_trait]
impl ScanProcess for FakeScanProcess {
    fn id(&self) -> Option<u32> {
        Some(4242)
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        Ok(self
            .exited
            .load(Ordering::SeqCst)
            .then(|| ProcessExit::from_code(0)))
    }

    async fn wait(&mut self) -> io::Result<ProcessExit> {
        while !self.exited.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        Ok(ProcessExit::from_code(0))
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::build(false)
    }

    pub fn gated() -> Self {
        Self::build(true)
    }

    fn build(gated: bool) -> Self {
        Self {
            inner: Arc::new(FakeRunnerInner {
                invocations: Mutex::new(Vec::new()),
                scan_exited: Arc::new(AtomicBool::new(false)),
                fail_spawn: AtomicBool::new(false),
                fail_stop: AtomicBool::new(false),
                hold_scan: AtomicBool::new(false),
                fail_process: AtomicBool::new(false),
                process_exit: AtomicI32::new(0),
                gated,
                gate: Semaphore::new(0),
            }),
        }
    }

    pub fn invocations(&self) -> Vec<(String, Vec<String>)> {
        self.inner.invocations.lock().clone()
    }

    pub fn fail_spawn(&self) {
        self.inner.fail_spawn.store(true, Ordering::SeqCst);
    }

    pub fn fail_stop(&self) {
        self.inner.fail_stop.store(true, Ordering::SeqCst);
    }

    pub fn allow_stop(&self) {
        self.inner.fail_stop.store(false, Ordering::SeqCst);
    }

    /// The stop command succeeds but leaves the scan running until
    /// [`finish_scan`](Self::finish_scan).
    pub fn hold_scan_on_stop(&self) {
        self.inner.hold_scan.store(true, Ordering::SeqCst);
    }

    pub fn fail_process(&self) {
        self.inner.fail_process.store(true, Ordering::SeqCst);
    }

    pub fn set_process_exit(&self, code: i32) {
        self.inner.process_exit.store(code, Ordering::SeqCst);
    }

    pub fn finish_scan(&self) {
        self.inner.scan_exited.store(true, Ordering::SeqCst);
    }

    pub fn release_processing(&self) {
        self.inner.gate.add_permits(1);
    }

    fn record(&self, command: &Path, args: &[String]) {
        self.inner
            .invocations
            .lock()
            .push((command.display().to_string(), args.to_vec()));
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    fn spawn(
        &self,
        command: &Path,
        args: &[String],
    ) -> io::Result<Box<dyn ScanProcess>> {
        if self.inner.fail_spawn.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "start script missing",
            ));
        }
        self.record(command, args);
        self.inner.scan_exited.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeScanProcess {
            exited: Arc::clone(&self.inner.scan_exited),
        }))
    }

    async fn run(
        &self,
        command: &Path,
        args: &[String],
    ) -> io::Result<ProcessExit> {
        if command == Path::new(STOP) {
            if self.inner.fail_stop.load(Ordering::SeqCst) {
                return Err(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "stop script not executable",
                ));
            }
            self.record(command, args);
            if !self.inner.hold_scan.load(Ordering::SeqCst) {
                self.inner.scan_exited.store(true, Ordering::SeqCst);
            }
            return Ok(ProcessExit::from_code(0));
        }

        self.record(command, args);
        if self.inner.gated {
            self.inner
                .gate
                .acquire()
                .await
                .map_err(|err| io::Error::other(err.to_string()))?
                .forget();
        }
        if self.inner.fail_process.load(Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "process script missing",
            ));
        }
        Ok(ProcessExit::from_code(
            self.inner.process_exit.load(Ordering::SeqCst),
        ))
    }
}
