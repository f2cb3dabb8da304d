//! Data model shared by the collector and the report sinks.
//!
//! - [`Shard`]: one started shard copy, measured once per cycle
//! - [`Index`]: per-index aggregate, split by primary/replica
//! - [`FileSuffixStat`]: per file-extension breakdown
//! - [`IndexStats`]: everything a cycle produced, handed to every sink
//! - [`PageCacheDoc`]: the record shape written to the reporting index

mod doc;
mod stats;

pub use doc::{CACHE_TOTAL_KEY, PageCacheDoc, build_docs};
pub use stats::{
    FileSuffixStat, Index, IndexStats, PAGES_PER_MB, Shard, SuffixCache, TOTAL_INDEX_NAME,
    pages_to_mb,
};
