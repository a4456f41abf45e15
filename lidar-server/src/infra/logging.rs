use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "info,tower_http=warn";

/// Install the global subscriber: stdout always, plus an append-only file
/// when `log_file` is set.
///
/// The returned guard flushes the file writer and must live until exit.
pub fn init_tracing(
    log_file: Option<&Path>,
) -> anyhow::Result<Option<WorkerGuard>> {
    // Override via RUST_LOG
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path.file_name().with_context(|| {
                format!("log file {} has no file name", path.display())
            })?;
            std::fs::create_dir_all(directory).with_context(|| {
                format!("failed to create log dir {}", directory.display())
            })?;

            let appender =
                tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(guard)
}
