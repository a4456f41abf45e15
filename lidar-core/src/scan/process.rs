use std::{
    fmt, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::process::{Child, Command};

/// Exit information of an external command.
///
/// Only the exit code is observed; stdout and stderr are inherited from the
/// server process and never parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for ProcessExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// Handle to a long-running external process owned by the register.
#[async_trait]
pub trait ScanProcess: Send + Sync + fmt::Debug {
    fn id(&self) -> Option<u32>;

    /// Non-blocking check; `Ok(None)` while the process is still running.
    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>>;

    async fn wait(&mut self) -> io::Result<ProcessExit>;
}

/// Capability for launching the scanner's external commands.
///
/// The lifecycle controller only talks to the outside world through this
/// trait, so tests can substitute a fake that never forks.
#[async_trait]
pub trait ProcessRunner: Send + Sync + fmt::Debug {
    /// Spawn `command` and return immediately with a handle to it.
    fn spawn(
        &self,
        command: &Path,
        args: &[String],
    ) -> io::Result<Box<dyn ScanProcess>>;

    /// Run `command` to completion.
    async fn run(&self, command: &Path, args: &[String])
    -> io::Result<ProcessExit>;
}

/// Paths of the three scripts driving the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommands {
    /// Invoked as `<start> <scan_name>`, keeps running while scanning.
    pub start: PathBuf,
    /// Invoked with no arguments to ask the running scan to finish.
    pub stop: PathBuf,
    /// Invoked as `<process> <scan_name>` once the scan has exited.
    pub process: PathBuf,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessRunner;

#[derive(Debug)]
struct TokioScanProcess {
    child: Child,
}

#[async_trait]
impl ScanProcess for TokioScanProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_wait(&mut self) -> io::Result<Option<ProcessExit>> {
        Ok(self.child.try_wait()?.map(ProcessExit::from))
    }

    async fn wait(&mut self) -> io::Result<ProcessExit> {
        Ok(self.child.wait().await?.into())
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    fn spawn(
        &self,
        command: &Path,
        args: &[String],
    ) -> io::Result<Box<dyn ScanProcess>> {
        let child = Command::new(command).args(args).spawn()?;
        Ok(Box::new(TokioScanProcess { child }))
    }

    async fn run(
        &self,
        command: &Path,
        args: &[String],
    ) -> io::Result<ProcessExit> {
        let status = Command::new(command).args(args).status().await?;
        Ok(status.into())
    }
}
