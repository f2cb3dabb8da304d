//! Report sinks: where a cycle's [`IndexStats`] go.
//!
//! Exactly one sink is active per run, selected by [`OutputMode`].

mod console;
mod es;
mod structured_log;

pub use console::{ConsoleSink, render_table};
pub use es::{EsReport, EsSink};
pub use structured_log::LogSink;

use std::fmt;
use std::io;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::model::IndexStats;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot write report: {0}")]
    Io(#[from] io::Error),
    #[error("cannot encode report record: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identity and timestamp stamped on every record of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub cluster_name: String,
    pub node_name: String,
    /// Cycle start.
    pub created: DateTime<Utc>,
}

impl ReportContext {
    pub fn new(
        cluster_name: impl Into<String>,
        node_name: impl Into<String>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            node_name: node_name.into(),
            created,
        }
    }

    /// UTC calendar day of the cycle, used for dated index names.
    pub fn today(&self) -> NaiveDate {
        self.created.date_naive()
    }
}

pub trait ReportSink {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn report(&mut self, stats: &IndexStats, ctx: &ReportContext) -> Result<(), SinkError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn report(&mut self, stats: &IndexStats, ctx: &ReportContext) -> Result<(), SinkError> {
        (**self).report(stats, ctx)
    }
}

#[derive(Debug, Error)]
#[error("unknown output mode '{0}' (expected console, log or es)")]
pub struct UnknownOutputMode(String);

/// Value of `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Log,
    Es,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Console => "console",
            OutputMode::Log => "log",
            OutputMode::Es => "es",
        }
    }
}

impl FromStr for OutputMode {
    type Err = UnknownOutputMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(OutputMode::Console),
            "log" => Ok(OutputMode::Log),
            "es" => Ok(OutputMode::Es),
            _ => Err(UnknownOutputMode(s.to_string())),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_output_mode_parse() {
        assert_eq!("console".parse::<OutputMode>().unwrap(), OutputMode::Console);
        assert_eq!("LOG".parse::<OutputMode>().unwrap(), OutputMode::Log);
        assert_eq!(" es ".parse::<OutputMode>().unwrap(), OutputMode::Es);
        assert!("kafka".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::Es.to_string(), "es");
    }

    #[test]
    fn test_context_today_is_utc_date() {
        let ctx = ReportContext::new("c", "n", Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap());
        assert_eq!(ctx.today(), NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }
}
