//! Bulk writes into the dated reporting index.

use tracing::{debug, warn};

use super::{ReportContext, ReportSink, SinkError};
use crate::model::{IndexStats, build_docs};
use crate::store::{ReportStore, RetentionManager};

/// Outcome of the last write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsReport {
    pub index: String,
    pub accepted: usize,
    pub rejected: usize,
}

pub struct EsSink<S: ReportStore> {
    store: S,
    retention: RetentionManager,
    last: Option<EsReport>,
}

impl<S: ReportStore> EsSink<S> {
    pub fn new(store: S, retention: RetentionManager) -> Self {
        Self {
            store,
            retention,
            last: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_report(&self) -> Option<&EsReport> {
        self.last.as_ref()
    }
}

impl<S: ReportStore> ReportSink for EsSink<S> {
    fn name(&self) -> &'static str {
        "es"
    }

    /// Prepares today's index, then writes every document in one bulk
    /// request. A failed prepare skips the write; rejected items are only
    /// logged.
    fn report(&mut self, stats: &IndexStats, ctx: &ReportContext) -> Result<(), SinkError> {
        self.last = None;
        let prepared = self.retention.prepare(&self.store, ctx.today())?;
        if let Some(deleted) = &prepared.deleted {
            debug!("Retention removed {}", deleted);
        }

        let docs = build_docs(stats, &ctx.cluster_name, &ctx.node_name, ctx.created);
        let response = self.store.bulk(&prepared.index, &docs)?;

        let mut rejected = 0;
        for (pos, item) in response.failures() {
            rejected += 1;
            let doc = docs.get(pos);
            warn!(
                "Bulk item rejected (index_name={}, primary={}, status={}): {}",
                doc.map_or("?", |d| d.index_name.as_str()),
                doc.is_some_and(|d| d.primary),
                item.status,
                item.error.as_deref().unwrap_or("unknown error")
            );
        }

        self.last = Some(EsReport {
            index: prepared.index,
            accepted: response.items.len() - rejected,
            rejected,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PAGES_PER_MB, Shard};
    use crate::store::{MockStore, RetentionConfig};
    use chrono::{TimeZone, Utc};

    fn sink(store: MockStore) -> EsSink<MockStore> {
        EsSink::new(
            store,
            RetentionManager::new(RetentionConfig {
                index_prefix: "pc_stat".to_string(),
                retention_days: 5,
            }),
        )
    }

    fn ctx() -> ReportContext {
        ReportContext::new("c1", "node-1", Utc.with_ymd_and_hms(2026, 3, 14, 8, 30, 0).unwrap())
    }

    fn stats() -> IndexStats {
        let mut a = Shard::new("logs-a", "0", "node-1", true);
        a.suffix_stat.add("cfs", 2 * PAGES_PER_MB, true);
        a.page_cache = 2 * PAGES_PER_MB;
        let mut b = Shard::new("logs-b", "0", "node-1", false);
        b.suffix_stat.add("dvd", PAGES_PER_MB, false);
        b.page_cache = PAGES_PER_MB;
        IndexStats::from_shards(&[a, b])
    }

    #[test]
    fn test_writes_all_docs_into_today_index() {
        let mut sink = sink(MockStore::new());
        sink.report(&stats(), &ctx()).unwrap();

        let written = sink.store().written();
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|(index, _)| index == "pc_stat-2026_03_14"));
        assert_eq!(written[4].1.index_name, "total");
        assert_eq!(written[4].1.cache["total"], 2);
        assert_eq!(written[5].1.cache["total"], 1);
        assert!(written.iter().all(|(_, d)| d.created == ctx().created));

        let report = sink.last_report().unwrap();
        assert_eq!(report.accepted, 6);
        assert_eq!(report.rejected, 0);
    }

    #[test]
    fn test_create_failure_skips_write() {
        let mut sink = sink(MockStore::new().failing_create());
        let err = sink.report(&stats(), &ctx());
        assert!(matches!(err, Err(SinkError::Store(_))));
        assert!(sink.store().written().is_empty());
        assert!(sink.last_report().is_none());
    }

    #[test]
    fn test_unreachable_store_skips_write() {
        let mut sink = sink(MockStore::new().unreachable());
        assert!(sink.report(&stats(), &ctx()).is_err());
    }

    #[test]
    fn test_rejected_items_do_not_fail_the_cycle() {
        let mut sink = sink(MockStore::new().rejecting("logs-b"));
        sink.report(&stats(), &ctx()).unwrap();

        let report = sink.last_report().unwrap();
        assert_eq!(report.rejected, 2);
        assert_eq!(report.accepted, 4);
        assert!(sink.store().written().iter().all(|(_, d)| d.index_name != "logs-b"));
    }

    #[test]
    fn test_expired_index_removed_before_write() {
        let store = MockStore::new();
        store.add_index("pc_stat-2026_03_08");
        let mut sink = sink(store);
        sink.report(&stats(), &ctx()).unwrap();
        assert_eq!(
            sink.store().index_names(),
            vec!["pc_stat-2026_03_14".to_string()]
        );
    }
}
