//! Shard, index and per-suffix page-cache accounting.
//!
//! All counters here are in cache pages (4 KiB). Conversion to megabytes
//! happens only when a value leaves the process, see [`pages_to_mb`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Pages per megabyte: one page is 4 KiB, so 256 pages make 1 MiB.
pub const PAGES_PER_MB: u64 = 256;

/// Name of the synthetic index that accumulates cluster-wide sums.
pub const TOTAL_INDEX_NAME: &str = "total";

/// Converts a page count into whole megabytes, truncating toward zero.
pub fn pages_to_mb(pages: u64) -> u64 {
    pages / PAGES_PER_MB
}

/// Cached pages of one file suffix, split by shard role.
///
/// `total == primary + replica` holds for every value built through
/// [`SuffixCache::of`] and [`SuffixCache::merge`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SuffixCache {
    pub total: u64,
    pub primary: u64,
    pub replica: u64,
}

impl SuffixCache {
    /// Pages contributed by a single shard copy.
    pub fn of(pages: u64, primary: bool) -> Self {
        if primary {
            Self {
                total: pages,
                primary: pages,
                replica: 0,
            }
        } else {
            Self {
                total: pages,
                primary: 0,
                replica: pages,
            }
        }
    }

    pub fn merge(self, other: Self) -> Self {
        Self {
            total: self.total + other.total,
            primary: self.primary + other.primary,
            replica: self.replica + other.replica,
        }
    }

    /// Pages held by primaries (`true`) or replicas (`false`).
    pub fn for_role(&self, primary: bool) -> u64 {
        if primary { self.primary } else { self.replica }
    }
}

/// Per-suffix breakdown of cached pages.
///
/// Keys are file extensions without the dot, or `"other"` for files
/// without one. Merging is commutative and associative, so shards can be
/// folded in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSuffixStat {
    buckets: BTreeMap<String, SuffixCache>,
}

impl FileSuffixStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `pages` of a file with the given suffix.
    pub fn add(&mut self, suffix: &str, pages: u64, primary: bool) {
        let contribution = SuffixCache::of(pages, primary);
        let bucket = self.buckets.entry(suffix.to_string()).or_default();
        *bucket = bucket.merge(contribution);
    }

    /// Folds every bucket of `other` into `self`.
    pub fn merge(&mut self, other: &FileSuffixStat) {
        for (suffix, cache) in &other.buckets {
            let bucket = self.buckets.entry(suffix.clone()).or_default();
            *bucket = bucket.merge(*cache);
        }
    }

    /// Consuming variant of [`FileSuffixStat::merge`].
    pub fn merged(mut self, other: &FileSuffixStat) -> Self {
        self.merge(other);
        self
    }

    pub fn get(&self, suffix: &str) -> Option<&SuffixCache> {
        self.buckets.get(suffix)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SuffixCache)> {
        self.buckets.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Sum over all buckets.
    pub fn total(&self) -> SuffixCache {
        self.buckets
            .values()
            .fold(SuffixCache::default(), |acc, c| acc.merge(*c))
    }
}

/// One started copy of a shard placed on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shard {
    pub index_name: String,
    pub shard_id: String,
    pub node_name: String,
    /// Storage uuid of the owning index, set by the catalog join.
    pub uuid: String,
    pub primary: bool,
    /// Cached pages over all probed files of the shard.
    pub page_cache: u64,
    pub suffix_stat: FileSuffixStat,
}

impl Shard {
    pub fn new(
        index_name: impl Into<String>,
        shard_id: impl Into<String>,
        node_name: impl Into<String>,
        primary: bool,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            shard_id: shard_id.into(),
            node_name: node_name.into(),
            uuid: String::new(),
            primary,
            page_cache: 0,
            suffix_stat: FileSuffixStat::new(),
        }
    }

    /// Catalog key: `index|shard|node`.
    pub fn key(&self) -> String {
        format!("{}|{}|{}", self.index_name, self.shard_id, self.node_name)
    }

    /// On-disk Lucene directory: `<indices_path>/<uuid>/<shard>/index`.
    pub fn data_dir(&self, indices_path: &Path) -> PathBuf {
        indices_path
            .join(&self.uuid)
            .join(&self.shard_id)
            .join("index")
    }
}

/// Aggregated cache usage of one index (or of the whole node for `"total"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub name: String,
    pub uuid: String,
    pub page_cache: u64,
    pub primary_page_cache: u64,
    pub replica_page_cache: u64,
    pub suffix_stat: FileSuffixStat,
}

impl Index {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
            ..Self::default()
        }
    }

    /// The contribution of a single shard, shaped as an index.
    pub fn from_shard(shard: &Shard) -> Self {
        let role = SuffixCache::of(shard.page_cache, shard.primary);
        Self {
            name: shard.index_name.clone(),
            uuid: shard.uuid.clone(),
            page_cache: role.total,
            primary_page_cache: role.primary,
            replica_page_cache: role.replica,
            suffix_stat: shard.suffix_stat.clone(),
        }
    }

    /// Adds the counters of `other` to `self`. Identity fields are kept.
    pub fn merge(&mut self, other: &Index) {
        self.page_cache += other.page_cache;
        self.primary_page_cache += other.primary_page_cache;
        self.replica_page_cache += other.replica_page_cache;
        self.suffix_stat.merge(&other.suffix_stat);
    }

    /// Cached pages held by primaries (`true`) or replicas (`false`).
    pub fn page_cache_for_role(&self, primary: bool) -> u64 {
        if primary {
            self.primary_page_cache
        } else {
            self.replica_page_cache
        }
    }
}

/// Result of one collection cycle: every collected index plus the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexStats {
    indices: BTreeMap<String, Index>,
    total: Index,
}

impl Default for IndexStats {
    fn default() -> Self {
        Self {
            indices: BTreeMap::new(),
            total: Index::new(TOTAL_INDEX_NAME, ""),
        }
    }
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a measured shard into its index and into the total.
    pub fn add_shard(&mut self, shard: &Shard) {
        let contribution = Index::from_shard(shard);
        self.indices
            .entry(shard.index_name.clone())
            .or_insert_with(|| Index::new(&shard.index_name, &shard.uuid))
            .merge(&contribution);
        self.total.merge(&contribution);
    }

    /// Builds stats from measured shards, in whatever order they come.
    pub fn from_shards<'a>(shards: impl IntoIterator<Item = &'a Shard>) -> Self {
        let mut stats = Self::new();
        for shard in shards {
            stats.add_shard(shard);
        }
        stats
    }

    /// Indices ordered by name.
    pub fn indices(&self) -> impl Iterator<Item = &Index> {
        self.indices.values()
    }

    /// Indices ordered by total cached pages, largest first. Ties keep
    /// name order.
    pub fn indices_by_cache(&self) -> Vec<&Index> {
        let mut list: Vec<&Index> = self.indices.values().collect();
        list.sort_by(|a, b| b.page_cache.cmp(&a.page_cache));
        list
    }

    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indices.get(name)
    }

    pub fn total(&self) -> &Index {
        &self.total
    }

    /// Number of real indices (the total is not counted).
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Length of the longest index name, 0 when empty.
    pub fn max_name_len(&self) -> usize {
        self.indices.keys().map(|n| n.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard(index: &str, id: &str, node: &str, primary: bool, files: &[(&str, u64)]) -> Shard {
        let mut s = Shard::new(index, id, node, primary);
        s.uuid = format!("{}-uuid", index);
        for (suffix, pages) in files {
            s.suffix_stat.add(suffix, *pages, primary);
            s.page_cache += pages;
        }
        s
    }

    fn sample_shards() -> Vec<Shard> {
        vec![
            shard("logs-1", "0", "n1", true, &[("doc", 100), ("tim", 30)]),
            shard("logs-1", "0", "n2", false, &[("doc", 90)]),
            shard("logs-2", "1", "n1", false, &[("fdt", 700), ("other", 3)]),
            shard("metrics", "0", "n1", true, &[("dvd", 512)]),
        ]
    }

    #[test]
    fn test_pages_to_mb_truncates() {
        assert_eq!(pages_to_mb(0), 0);
        assert_eq!(pages_to_mb(255), 0);
        assert_eq!(pages_to_mb(256), 1);
        assert_eq!(pages_to_mb(767), 2);
    }

    #[test]
    fn test_suffix_cache_role_split() {
        let p = SuffixCache::of(10, true);
        let r = SuffixCache::of(4, false);
        let merged = p.merge(r);
        assert_eq!(merged.total, 14);
        assert_eq!(merged.primary, 10);
        assert_eq!(merged.replica, 4);
        assert_eq!(merged.for_role(true), 10);
        assert_eq!(merged.for_role(false), 4);
    }

    #[test]
    fn test_file_suffix_stat_add() {
        let mut stat = FileSuffixStat::new();
        stat.add("doc", 5, true);
        stat.add("doc", 7, false);
        stat.add("tim", 1, true);

        let doc = stat.get("doc").unwrap();
        assert_eq!(doc.total, 12);
        assert_eq!(doc.total, doc.primary + doc.replica);
        assert_eq!(stat.len(), 2);
        assert_eq!(stat.total().total, 13);
    }

    #[test]
    fn test_file_suffix_stat_merge_commutative() {
        let mut a = FileSuffixStat::new();
        a.add("doc", 5, true);
        a.add("tim", 2, false);
        let mut b = FileSuffixStat::new();
        b.add("doc", 1, false);
        b.add("pos", 9, true);

        let ab = a.clone().merged(&b);
        let ba = b.clone().merged(&a);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_file_suffix_stat_merge_associative() {
        let mut a = FileSuffixStat::new();
        a.add("doc", 5, true);
        let mut b = FileSuffixStat::new();
        b.add("doc", 3, false);
        b.add("tim", 1, false);
        let mut c = FileSuffixStat::new();
        c.add("tim", 8, true);

        let left = a.clone().merged(&b).merged(&c);
        let right = a.merged(&b.merged(&c));
        assert_eq!(left, right);
    }

    #[test]
    fn test_shard_key_and_dir() {
        let s = shard("logs-1", "3", "node-a", true, &[]);
        assert_eq!(s.key(), "logs-1|3|node-a");
        assert_eq!(
            s.data_dir(Path::new("/data/indices")),
            PathBuf::from("/data/indices/logs-1-uuid/3/index")
        );
    }

    #[test]
    fn test_total_equals_sum_of_indices() {
        let stats = IndexStats::from_shards(&sample_shards());
        let total = stats.total();

        let sum: u64 = stats.indices().map(|i| i.page_cache).sum();
        assert_eq!(total.page_cache, sum);
        assert_eq!(
            total.primary_page_cache + total.replica_page_cache,
            total.page_cache
        );
        assert_eq!(total.page_cache, 100 + 30 + 90 + 700 + 3 + 512);
        assert_eq!(total.name, TOTAL_INDEX_NAME);
    }

    #[test]
    fn test_index_role_split() {
        let stats = IndexStats::from_shards(&sample_shards());
        let logs = stats.get("logs-1").unwrap();
        assert_eq!(logs.primary_page_cache, 130);
        assert_eq!(logs.replica_page_cache, 90);
        assert_eq!(logs.uuid, "logs-1-uuid");

        let doc = logs.suffix_stat.get("doc").unwrap();
        assert_eq!(doc.primary, 100);
        assert_eq!(doc.replica, 90);
    }

    #[test]
    fn test_fold_order_does_not_matter() {
        let shards = sample_shards();
        let forward = IndexStats::from_shards(&shards);
        let reversed = IndexStats::from_shards(shards.iter().rev());
        let interleaved = IndexStats::from_shards([&shards[2], &shards[0], &shards[3], &shards[1]]);

        assert_eq!(forward, reversed);
        assert_eq!(forward, interleaved);
    }

    #[test]
    fn test_indices_by_cache_desc() {
        let stats = IndexStats::from_shards(&sample_shards());
        let names: Vec<&str> = stats
            .indices_by_cache()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, vec!["logs-2", "metrics", "logs-1"]);
    }

    #[test]
    fn test_empty_stats() {
        let stats = IndexStats::new();
        assert!(stats.is_empty());
        assert_eq!(stats.max_name_len(), 0);
        assert_eq!(stats.total().page_cache, 0);
    }
}
