use anyhow::{Context, bail};
use clap::Args as ClapArgs;
use lidar_core::{ScanArchive, ScanCommands, archive::DEFAULT_SCAN_EXTENSION};
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};
use tracing::warn;

/// Command line / environment options for the server.
#[derive(ClapArgs, Debug, Clone)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, env = "LIDAR_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "LIDAR_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory the processing script writes finished scans into
    #[arg(long, env = "LIDAR_SCAN_DIR", default_value = "./scans")]
    pub scan_dir: PathBuf,

    /// Script that starts a scan; receives the scan name
    #[arg(
        long,
        env = "LIDAR_START_SCRIPT",
        default_value = "./lidar_scripts/start_scan.sh"
    )]
    pub start_script: PathBuf,

    /// Script that asks the running scan to stop
    #[arg(
        long,
        env = "LIDAR_STOP_SCRIPT",
        default_value = "./lidar_scripts/stop_scan.sh"
    )]
    pub stop_script: PathBuf,

    /// Script that post-processes a stopped scan; receives the scan name
    #[arg(
        long,
        env = "LIDAR_PROCESS_SCRIPT",
        default_value = "./lidar_scripts/process_scan.sh"
    )]
    pub process_script: PathBuf,

    /// File extension of finished scans (with or without the dot)
    #[arg(
        long,
        env = "LIDAR_SCAN_EXTENSION",
        default_value = DEFAULT_SCAN_EXTENSION
    )]
    pub scan_extension: String,

    /// Also append logs to this file
    #[arg(long, env = "LIDAR_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Archive settings
    pub scan_dir: PathBuf,
    pub scan_extension: String,

    // External scanner scripts
    pub commands: ScanCommands,

    pub log_file: Option<PathBuf>,
}

impl Config {
    pub fn from_args(args: ServeArgs) -> anyhow::Result<Self> {
        let scan_extension =
            args.scan_extension.trim().trim_start_matches('.').to_string();
        if scan_extension.is_empty() {
            bail!("scan extension must not be empty");
        }

        Ok(Self {
            server_host: args.host,
            server_port: args.port,
            scan_dir: args.scan_dir,
            scan_extension,
            commands: ScanCommands {
                start: args.start_script,
                stop: args.stop_script,
                process: args.process_script,
            },
            log_file: args.log_file,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .server_host
            .parse()
            .with_context(|| format!("invalid host {}", self.server_host))?;
        Ok(SocketAddr::new(ip, self.server_port))
    }

    pub fn archive(&self) -> ScanArchive {
        ScanArchive::new(&self.scan_dir, &self.scan_extension)
    }

    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        self.archive().ensure_exists().with_context(|| {
            format!("failed to create scan dir {}", self.scan_dir.display())
        })?;
        Ok(())
    }

    /// Canonicalize the scan directory. Called once at startup right after
    /// `ensure_directories`.
    pub fn normalize_paths(&mut self) -> anyhow::Result<()> {
        self.scan_dir = std::fs::canonicalize(&self.scan_dir)?;
        Ok(())
    }

    /// Scripts are only invoked on demand, so a missing one is reported at
    /// startup but does not prevent serving.
    pub fn warn_missing_scripts(&self) {
        let ScanCommands {
            start,
            stop,
            process,
        } = &self.commands;
        let scripts = [("start", start), ("stop", stop), ("process", process)];
        for (role, path) in scripts {
            if !path.is_file() {
                warn!(role, path = %path.display(), "scanner script not found");
            }
        }
    }
}
