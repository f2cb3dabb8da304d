//! The per-node agent: topology, collector and sink wired into one
//! [`Cycle`].

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::collector::{Collector, FileSystem, ResidencyProbe, ShardCatalogBuilder, TopologySource};
use crate::fmt::{format_elapsed, format_pages};
use crate::model::IndexStats;
use crate::scheduler::Cycle;
use crate::sink::{ReportContext, ReportSink};

pub struct Agent<T, F, P, S>
where
    T: TopologySource,
    F: FileSystem,
    P: ResidencyProbe,
    S: ReportSink,
{
    source: T,
    builder: ShardCatalogBuilder,
    collector: Collector<F, P>,
    sink: S,
    cluster_name: String,
    node_name: String,
    failed_reports: u64,
}

impl<T, F, P, S> Agent<T, F, P, S>
where
    T: TopologySource,
    F: FileSystem,
    P: ResidencyProbe,
    S: ReportSink,
{
    /// # Arguments
    /// * `source` - Where the shard and index listings come from
    /// * `builder` - Prefix and node filters for the catalog
    /// * `collector` - Measures the cataloged shards
    /// * `sink` - Receives every cycle's stats
    /// * `cluster_name`, `node_name` - Stamped on every report record
    pub fn new(
        source: T,
        builder: ShardCatalogBuilder,
        collector: Collector<F, P>,
        sink: S,
        cluster_name: impl Into<String>,
        node_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            builder,
            collector,
            sink,
            cluster_name: cluster_name.into(),
            node_name: node_name.into(),
            failed_reports: 0,
        }
    }

    pub fn collector(&self) -> &Collector<F, P> {
        &self.collector
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Cycles whose report did not reach the sink.
    pub fn failed_reports(&self) -> u64 {
        self.failed_reports
    }
}

impl<T, F, P, S> Cycle for Agent<T, F, P, S>
where
    T: TopologySource,
    F: FileSystem,
    P: ResidencyProbe,
    S: ReportSink,
{
    fn collect(&mut self, _started: DateTime<Utc>) -> IndexStats {
        let stats = self.collector.collect(&self.source, &self.builder);
        if let Some(t) = self.collector.last_timing() {
            info!(
                "Collected {} indices, {} shards, {} files: {} cached in {} (topology {}, listing {}, probe {})",
                stats.len(),
                t.shards,
                t.files,
                format_pages(stats.total().page_cache),
                format_elapsed(t.total),
                format_elapsed(t.topology),
                format_elapsed(t.listing),
                format_elapsed(t.probe),
            );
        }
        stats
    }

    fn report(&mut self, stats: &IndexStats, started: DateTime<Utc>) {
        let ctx = ReportContext::new(&self.cluster_name, &self.node_name, started);
        if let Err(e) = self.sink.report(stats, &ctx) {
            self.failed_reports += 1;
            error!("{} report skipped: {}", self.sink.name(), e);
        }
    }
}
