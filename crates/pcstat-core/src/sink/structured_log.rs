//! One JSON line per (index, role).
//!
//! The daemon hands this sink a non-blocking, daily-rotated file writer, so a
//! log shipper can pick the records up as they are written.

use std::collections::BTreeMap;
use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::{ReportContext, ReportSink, SinkError};
use crate::model::{IndexStats, build_docs};

/// Level every record is tagged with.
const RECORD_LEVEL: &str = "info";

#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    level: &'static str,
    index_name: &'a str,
    cache: &'a BTreeMap<String, u64>,
    primary: bool,
    node_name: &'a str,
    time: DateTime<Utc>,
    cluster_name: &'a str,
}

pub struct LogSink<W: Write> {
    out: W,
    records: u64,
}

impl<W: Write> LogSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, records: 0 }
    }

    /// Records written since start.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportSink for LogSink<W> {
    fn name(&self) -> &'static str {
        "log"
    }

    fn report(&mut self, stats: &IndexStats, ctx: &ReportContext) -> Result<(), SinkError> {
        let docs = build_docs(stats, &ctx.cluster_name, &ctx.node_name, ctx.created);
        for doc in &docs {
            let record = LogRecord {
                level: RECORD_LEVEL,
                index_name: &doc.index_name,
                cache: &doc.cache,
                primary: doc.primary,
                node_name: &doc.node_name,
                time: doc.created,
                cluster_name: &doc.cluster_name,
            };
            serde_json::to_writer(&mut self.out, &record)?;
            self.out.write_all(b"\n")?;
            self.records += 1;
        }
        self.out.flush()?;
        debug!("Wrote {} report records", docs.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PAGES_PER_MB, Shard};
    use chrono::TimeZone;
    use serde_json::Value;
    use std::io;

    fn stats() -> IndexStats {
        let mut s = Shard::new("logs-1", "0", "n1", true);
        s.page_cache = 3 * PAGES_PER_MB;
        s.suffix_stat.add("cfs", 3 * PAGES_PER_MB, true);
        IndexStats::from_shards(&[s])
    }

    fn ctx() -> ReportContext {
        ReportContext::new(
            "es-prod",
            "node-1",
            Utc.with_ymd_and_hms(2026, 3, 14, 10, 0, 0).unwrap(),
        )
    }

    fn records(sink: LogSink<Vec<u8>>) -> Vec<Value> {
        let output = String::from_utf8(sink.into_inner()).unwrap();
        output
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_one_record_per_index_role() {
        let mut sink = LogSink::new(Vec::new());
        sink.report(&stats(), &ctx()).unwrap();
        assert_eq!(sink.records(), 4);

        let records = records(sink);
        assert_eq!(records.len(), 4);

        let first = &records[0];
        assert_eq!(first["level"], "info");
        assert_eq!(first["index_name"], "logs-1");
        assert_eq!(first["primary"], true);
        assert_eq!(first["node_name"], "node-1");
        assert_eq!(first["cluster_name"], "es-prod");
        assert_eq!(first["time"], "2026-03-14T10:00:00Z");

        assert_eq!(records[1]["primary"], false);
        assert_eq!(records[3]["index_name"], "total");
    }

    #[test]
    fn test_cache_is_a_nested_map() {
        let mut sink = LogSink::new(Vec::new());
        sink.report(&stats(), &ctx()).unwrap();

        let records = records(sink);
        let cache = &records[0]["cache"];
        assert!(cache.is_object(), "{}", cache);
        assert_eq!(cache["cfs"], 3);
        assert_eq!(cache["total"], 3);
        assert_eq!(records[1]["cache"]["cfs"], 0);
    }

    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_failure_is_reported() {
        let mut sink = LogSink::new(Broken);
        assert!(sink.report(&stats(), &ctx()).is_err());
        assert_eq!(sink.records(), 0);
    }
}
