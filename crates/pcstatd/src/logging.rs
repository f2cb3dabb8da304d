//! Subscriber setup for the daemon, and the report file of `log` mode.
//!
//! Operational messages always go to stderr. Report records never pass
//! through the subscriber: the log sink writes them as JSON lines to a
//! daily-rotated file, so `-q` does not silence them.

use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::prelude::*;

/// Crates whose operational messages follow `-v`/`-q`.
const OWN_TARGETS: [&str; 2] = ["pcstatd", "pcstat_core"];

/// Default level is INFO. `-v` DEBUG, `-vv` TRACE, `-q` errors only.
pub fn level(verbose: u8, quiet: bool) -> Level {
    if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// `RUST_LOG` plus our own crates at `level`.
fn operational_filter(level: Level) -> EnvFilter {
    OWN_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .filter_map(|directive| directive.parse::<Directive>().ok())
        .fold(EnvFilter::from_default_env(), |filter, d| filter.add_directive(d))
}

/// Splits `/var/log/pcstat/pcstat.log` into the directory and the file
/// name prefix the appender rotates under.
pub fn split_log_path(path: &Path) -> (PathBuf, String) {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pcstat.log".to_string());
    (dir, prefix)
}

/// Installs the global stderr subscriber.
pub fn init(level: Level) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(false)
                .with_filter(operational_filter(level)),
        )
        .init();
}

/// Opens the daily-rotated report file behind a non-blocking writer.
///
/// The guard flushes pending lines on drop and must outlive the sink.
pub fn report_writer(path: &Path, keep: usize) -> io::Result<(NonBlocking, WorkerGuard)> {
    let (dir, prefix) = split_log_path(path);
    std::fs::create_dir_all(&dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .max_log_files(keep.max(1))
        .build(&dir)
        .map_err(io::Error::other)?;
    Ok(tracing_appender::non_blocking(appender))
}
