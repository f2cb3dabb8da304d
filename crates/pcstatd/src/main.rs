//! pcstatd - page-cache residency collector daemon.
//!
//! Every interval, measures how much of each collected index's shard files
//! sits in the OS page cache on this node and reports it to the console, a
//! JSON log file or a dated reporting index.

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Returns unused jemalloc pages to the operating system.
fn release_memory_to_os() {
    // SAFETY: mallctl with a valid NUL-terminated name and no in/out buffers.
    // arena.0.purge tells jemalloc to return unused pages to the OS.
    unsafe {
        tikv_jemalloc_sys::mallctl(
            c"arena.0.purge".as_ptr().cast(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
            0,
        );
    }
}

mod logging;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use pcstat_core::agent::Agent;
use pcstat_core::collector::{Collector, MincoreProbe, RealFs};
use pcstat_core::config::Config;
use pcstat_core::model::IndexStats;
use pcstat_core::scheduler::{Cycle, Scheduler};
use pcstat_core::sink::{ConsoleSink, EsSink, LogSink, OutputMode, ReportSink};
use pcstat_core::store::{EsClient, RetentionManager};

/// Page-cache residency collector daemon.
#[derive(Parser, Debug)]
#[command(name = "pcstatd", about = "Page-cache residency collector for search-cluster shards", version)]
struct Args {
    /// Path to the TOML configuration file.
    config: PathBuf,

    /// Collection interval in seconds.
    #[arg(short, long, default_value = "60", value_parser = clap::value_parser!(u64).range(1..))]
    interval: u64,

    /// Where reports go: console, log or es.
    #[arg(short, long, default_value = "console")]
    output: OutputMode,

    /// Sort console rows by cached size, largest first.
    #[arg(short, long)]
    sort: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Purges jemalloc arenas after every report.
struct Daemon<C: Cycle> {
    inner: C,
}

impl<C: Cycle> Cycle for Daemon<C> {
    fn collect(&mut self, started: DateTime<Utc>) -> IndexStats {
        self.inner.collect(started)
    }

    fn report(&mut self, stats: &IndexStats, started: DateTime<Utc>) {
        self.inner.report(stats, started);
        release_memory_to_os();
        debug!("Memory released after cycle");
    }
}

/// The sink for `output`, plus the report file guard in `log` mode.
fn build_sink(
    output: OutputMode,
    sort: bool,
    config: &Config,
    client: &EsClient,
) -> io::Result<(Box<dyn ReportSink>, Option<WorkerGuard>)> {
    let mut guard = None;
    let sink: Box<dyn ReportSink> = match output {
        OutputMode::Console => Box::new(ConsoleSink::stdout(sort)),
        OutputMode::Log => {
            let log = &config.output.log;
            let (writer, file_guard) = logging::report_writer(&log.log_path, log.keep_log_num)?;
            info!(
                "Report records go to {} (keeping {} files)",
                log.log_path.display(),
                log.keep_log_num
            );
            guard = Some(file_guard);
            Box::new(LogSink::new(writer))
        }
        OutputMode::Es => Box::new(EsSink::new(
            client.clone(),
            RetentionManager::new(config.retention()),
        )),
    };
    Ok((sink, guard))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("pcstatd: {}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(logging::level(args.verbose, args.quiet));

    info!(
        "Starting: cluster {} at {}:{}, node {}, output {}, interval {}s",
        config.es.cluster_name,
        config.es.host,
        config.es.port,
        if config.es.node_name.is_empty() { "<all>" } else { config.es.node_name.as_str() },
        args.output,
        args.interval
    );

    let client = match EsClient::new(&config.es.host, config.es.port, config.timeout()) {
        Ok(client) => client,
        Err(e) => {
            error!("Cannot create HTTP client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if !cfg!(target_os = "linux") {
        warn!("Page-cache probing needs Linux; every shard will report zero");
    }

    let collector = Collector::new(RealFs::new(), MincoreProbe::new(), config.es.indices_path.clone());
    // The guard flushes the report file on drop, after the agent is gone
    let (sink, _report_guard) = match build_sink(args.output, args.sort, &config, &client) {
        Ok(built) => built,
        Err(e) => {
            error!("Cannot open report log: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let agent = Agent::new(
        client,
        config.catalog_builder(),
        collector,
        sink,
        config.es.cluster_name.as_str(),
        config.es.node_name.as_str(),
    );

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    let mut scheduler = Scheduler::new(Duration::from_secs(args.interval));
    let mut daemon = Daemon { inner: agent };
    info!("Starting collection loop");
    scheduler.run(&mut daemon, &running);

    info!("Shutdown complete after {} cycles", scheduler.cycles());
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["pcstatd", "/etc/pcstat.toml"]).unwrap();
        assert_eq!(args.config, PathBuf::from("/etc/pcstat.toml"));
        assert_eq!(args.interval, 60);
        assert_eq!(args.output, OutputMode::Console);
        assert!(!args.sort);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "pcstatd", "pcstat.toml", "--interval", "30", "--output", "es", "--sort", "-vv",
        ])
        .unwrap();
        assert_eq!(args.interval, 30);
        assert_eq!(args.output, OutputMode::Es);
        assert!(args.sort);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_args_rejects_zero_interval() {
        assert!(Args::try_parse_from(["pcstatd", "c.toml", "--interval", "0"]).is_err());
    }

    #[test]
    fn test_args_rejects_unknown_output() {
        assert!(Args::try_parse_from(["pcstatd", "c.toml", "--output", "kafka"]).is_err());
    }

    #[test]
    fn test_args_require_config() {
        assert!(Args::try_parse_from(["pcstatd"]).is_err());
    }

    #[test]
    fn test_release_memory_does_not_crash() {
        release_memory_to_os();
    }
}
