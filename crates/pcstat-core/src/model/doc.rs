//! Wire record written to the reporting index and to the structured log.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::stats::{Index, IndexStats, pages_to_mb};

/// Key of the per-document sum inside [`PageCacheDoc::cache`].
pub const CACHE_TOTAL_KEY: &str = "total";

/// Cache usage of one index for one shard role, in megabytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCacheDoc {
    /// Suffix -> MB, plus `"total"`.
    pub cache: BTreeMap<String, u64>,
    pub primary: bool,
    pub cluster_name: String,
    pub node_name: String,
    pub index_name: String,
    pub created: DateTime<Utc>,
}

impl PageCacheDoc {
    /// Builds the document of `index` for primaries (`true`) or replicas.
    ///
    /// The `"total"` entry is the role sum converted once, so it can exceed
    /// the sum of the already truncated per-suffix values.
    pub fn from_index(
        index: &Index,
        primary: bool,
        cluster_name: &str,
        node_name: &str,
        created: DateTime<Utc>,
    ) -> Self {
        let mut cache = BTreeMap::new();
        let mut total_pages = 0u64;
        for (suffix, bucket) in index.suffix_stat.iter() {
            let pages = bucket.for_role(primary);
            cache.insert(suffix.to_string(), pages_to_mb(pages));
            total_pages += pages;
        }
        if let Some(mb) = cache.insert(CACHE_TOTAL_KEY.to_string(), pages_to_mb(total_pages)) {
            debug!(
                "{}: files with suffix '{}' ({} MB) are shadowed by the role total",
                index.name, CACHE_TOTAL_KEY, mb
            );
        }

        Self {
            cache,
            primary,
            cluster_name: cluster_name.to_string(),
            node_name: node_name.to_string(),
            index_name: index.name.clone(),
            created,
        }
    }
}

/// Two documents per index (primary, then replica), the total last.
pub fn build_docs(
    stats: &IndexStats,
    cluster_name: &str,
    node_name: &str,
    created: DateTime<Utc>,
) -> Vec<PageCacheDoc> {
    stats
        .indices()
        .chain(std::iter::once(stats.total()))
        .flat_map(|index| {
            [true, false].map(|primary| {
                PageCacheDoc::from_index(index, primary, cluster_name, node_name, created)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Shard;
    use chrono::TimeZone;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    fn measured(index: &str, primary: bool, files: &[(&str, u64)]) -> Shard {
        let mut s = Shard::new(index, "0", if primary { "n1" } else { "n2" }, primary);
        for (suffix, pages) in files {
            s.suffix_stat.add(suffix, *pages, primary);
            s.page_cache += pages;
        }
        s
    }

    #[test]
    fn test_two_docs_per_index_plus_total() {
        let stats = IndexStats::from_shards(&[
            measured("a", true, &[("doc", 512)]),
            measured("b", false, &[("doc", 256)]),
        ]);
        let docs = build_docs(&stats, "c1", "n1", created());
        assert_eq!(docs.len(), 6);

        let names: Vec<(&str, bool)> = docs
            .iter()
            .map(|d| (d.index_name.as_str(), d.primary))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a", true),
                ("a", false),
                ("b", true),
                ("b", false),
                ("total", true),
                ("total", false),
            ]
        );
    }

    #[test]
    fn test_role_counts_only() {
        let stats = IndexStats::from_shards(&[
            measured("a", true, &[("doc", 512), ("tim", 256)]),
            measured("a", false, &[("doc", 1024)]),
        ]);
        let index = stats.get("a").unwrap();

        let pri = PageCacheDoc::from_index(index, true, "c", "n", created());
        assert_eq!(pri.cache["doc"], 2);
        assert_eq!(pri.cache["tim"], 1);
        assert_eq!(pri.cache[CACHE_TOTAL_KEY], 3);

        let rep = PageCacheDoc::from_index(index, false, "c", "n", created());
        assert_eq!(rep.cache["doc"], 4);
        assert_eq!(rep.cache["tim"], 0);
        assert_eq!(rep.cache[CACHE_TOTAL_KEY], 4);
    }

    #[test]
    fn test_total_converted_after_summing() {
        // 200 + 200 pages: each rounds down to 0 MB, the sum is 1 MB
        let stats = IndexStats::from_shards(&[measured("a", true, &[("doc", 200), ("tim", 200)])]);
        let doc = PageCacheDoc::from_index(stats.get("a").unwrap(), true, "c", "n", created());
        assert_eq!(doc.cache["doc"], 0);
        assert_eq!(doc.cache["tim"], 0);
        assert_eq!(doc.cache[CACHE_TOTAL_KEY], 1);
    }

    #[test]
    fn test_total_suffix_is_shadowed_and_logged() {
        let buf = SharedBuf::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .without_time()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let stats = IndexStats::from_shards(&[measured("a", true, &[("total", 256), ("doc", 512)])]);
        let doc = tracing::subscriber::with_default(subscriber, || {
            PageCacheDoc::from_index(stats.get("a").unwrap(), true, "c", "n", created())
        });
        assert_eq!(doc.cache.len(), 2);
        assert_eq!(doc.cache[CACHE_TOTAL_KEY], 3);

        let output = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("a: files with suffix 'total' (1 MB) are shadowed"), "{}", output);
    }

    #[test]
    fn test_serialized_field_names() {
        let stats = IndexStats::from_shards(&[measured("a", true, &[("doc", 256)])]);
        let doc = PageCacheDoc::from_index(stats.get("a").unwrap(), true, "c1", "n1", created());
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json["cluster_name"], "c1");
        assert_eq!(json["node_name"], "n1");
        assert_eq!(json["index_name"], "a");
        assert_eq!(json["primary"], true);
        assert_eq!(json["cache"]["doc"], 1);
        assert_eq!(json["created"], "2026-03-14T09:26:53Z");
    }
}
