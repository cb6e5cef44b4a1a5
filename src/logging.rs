use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

/// File name used when the viewer logs without `--log-file`.
pub const DEFAULT_LOG_FILE: &str = "logsift.log";

#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    File(PathBuf),
    Stderr,
    Off,
}

/// The interactive viewer owns the terminal, so it only logs to a file: the
/// one given, or one in the temp directory when `RUST_LOG` asks for output.
fn log_target(log_file: Option<&Path>, interactive: bool, rust_log_set: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path.to_path_buf()),
        None if !interactive => LogTarget::Stderr,
        None if rust_log_set => LogTarget::File(std::env::temp_dir().join(DEFAULT_LOG_FILE)),
        None => LogTarget::Off,
    }
}

/// Install the global tracing subscriber.
///
/// With a log file everything at `info` and above goes to the file (unless
/// `RUST_LOG` says otherwise), and warnings are copied to stderr outside the
/// viewer. Without one, warnings go to stderr.
pub fn init_logging(log_file: Option<&Path>, interactive: bool) -> Result<()> {
    let rust_log_set = std::env::var_os(EnvFilter::DEFAULT_ENV).is_some();
    let target = log_target(log_file, interactive, rust_log_set);

    let (default_level, writer) = match &target {
        LogTarget::File(path) => {
            let appender = tracing_appender::rolling::never(
                path.parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new(".")),
                path.file_name().unwrap_or(OsStr::new(DEFAULT_LOG_FILE)),
            );
            let writer = if interactive {
                BoxMakeWriter::new(appender)
            } else {
                BoxMakeWriter::new(appender.and(std::io::stderr.with_max_level(tracing::Level::WARN)))
            };
            ("info", writer)
        }
        LogTarget::Stderr => ("warn", BoxMakeWriter::new(std::io::stderr)),
        LogTarget::Off => ("off", BoxMakeWriter::new(std::io::sink)),
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(target == LogTarget::Stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialise logging: {e}"))
}
