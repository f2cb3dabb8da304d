//! Aggregation engine: measures every shard of the catalog and folds the
//! results into [`IndexStats`].

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::collector::probe::ResidencyProbe;
use crate::collector::suffix::{SuffixFilter, file_suffix};
use crate::collector::topology::{ShardCatalog, ShardCatalogBuilder, TopologySource};
use crate::collector::traits::FileSystem;
use crate::model::{FileSuffixStat, IndexStats, Shard};

/// Timing and volume of the last collection.
#[derive(Debug, Clone, Default)]
pub struct CollectorTiming {
    /// Total collection time.
    pub total: Duration,
    /// Time to fetch and join the topology listings.
    pub topology: Duration,
    /// Time spent listing shard directories.
    pub listing: Duration,
    /// Time spent inside the residency probe.
    pub probe: Duration,
    /// Shards measured.
    pub shards: usize,
    /// Files handed to the probe.
    pub files: usize,
}

/// Measures page-cache residency of shards on this node.
pub struct Collector<F: FileSystem, P: ResidencyProbe> {
    fs: F,
    probe: P,
    indices_path: PathBuf,
    suffix_filter: SuffixFilter,
    last_timing: Option<CollectorTiming>,
}

impl<F: FileSystem, P: ResidencyProbe> Collector<F, P> {
    /// Creates a new collector.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `probe` - Residency probe (mincore or mock)
    /// * `indices_path` - The node's `indices` data directory
    pub fn new(fs: F, probe: P, indices_path: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            probe,
            indices_path: indices_path.into(),
            suffix_filter: SuffixFilter::default(),
            last_timing: None,
        }
    }

    /// Replaces the default suffix filter.
    pub fn with_suffix_filter(mut self, filter: SuffixFilter) -> Self {
        self.suffix_filter = filter;
        self
    }

    pub fn indices_path(&self) -> &Path {
        &self.indices_path
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    /// Returns timing information from the last `collect`/`aggregate` call.
    pub fn last_timing(&self) -> Option<&CollectorTiming> {
        self.last_timing.as_ref()
    }

    /// Files of the shard worth probing. An unreadable directory yields none.
    fn shard_files(&self, shard: &Shard) -> Vec<PathBuf> {
        let dir = shard.data_dir(&self.indices_path);
        match self.fs.read_dir(&dir) {
            Ok(entries) => {
                let files = entries.into_iter().filter(|p| self.fs.is_file(p)).collect();
                self.suffix_filter.retain(files)
            }
            Err(e) => {
                warn!("Cannot list shard {} at {}: {}", shard.key(), dir.display(), e);
                Vec::new()
            }
        }
    }

    /// Probes one shard and returns it with `page_cache` and `suffix_stat` set.
    fn measure_shard(&self, mut shard: Shard, timing: &mut CollectorTiming) -> Shard {
        let start = Instant::now();
        let files = self.shard_files(&shard);
        timing.listing += start.elapsed();

        let mut suffix_stat = FileSuffixStat::new();
        let mut page_cache = 0u64;

        if !files.is_empty() {
            timing.files += files.len();
            let start = Instant::now();
            let result = self.probe.probe(&files);
            timing.probe += start.elapsed();

            match result {
                Ok(residency) => {
                    for file in residency {
                        page_cache += file.cached_pages;
                        suffix_stat.add(&file_suffix(&file.path), file.cached_pages, shard.primary);
                    }
                }
                Err(e) => warn!("Probe failed for shard {}: {}", shard.key(), e),
            }
        }

        shard.page_cache = page_cache;
        shard.suffix_stat = suffix_stat;
        shard
    }

    /// Measures every shard of the catalog and folds the results.
    pub fn aggregate(&mut self, catalog: ShardCatalog) -> IndexStats {
        let start = Instant::now();
        let mut timing = CollectorTiming::default();
        let stats = self.aggregate_with_timing(catalog, &mut timing);
        timing.total = start.elapsed();
        self.last_timing = Some(timing);
        stats
    }

    fn aggregate_with_timing(
        &self,
        catalog: ShardCatalog,
        timing: &mut CollectorTiming,
    ) -> IndexStats {
        let mut stats = IndexStats::new();
        for shard in catalog {
            let shard = self.measure_shard(shard, timing);
            debug!(
                "Shard {}: {} pages over {} suffixes",
                shard.key(),
                shard.page_cache,
                shard.suffix_stat.len()
            );
            stats.add_shard(&shard);
            timing.shards += 1;
        }
        stats
    }

    /// Fetches the topology, builds the catalog and measures it.
    pub fn collect<T: TopologySource>(
        &mut self,
        source: &T,
        builder: &ShardCatalogBuilder,
    ) -> IndexStats {
        let total_start = Instant::now();
        let mut timing = CollectorTiming::default();

        let start = Instant::now();
        let catalog = builder.build(source);
        timing.topology = start.elapsed();

        let stats = self.aggregate_with_timing(catalog, &mut timing);
        timing.total = total_start.elapsed();
        self.last_timing = Some(timing);
        stats
    }
}
