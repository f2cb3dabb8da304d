//! Page-cache residency collector for search-cluster shards.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Collector                           │
//! │  ┌──────────────────────┐   ┌─────────────────────────────┐  │
//! │  │ ShardCatalogBuilder  │   │        SuffixFilter         │  │
//! │  │ - _cat/shards        │   │ - drops lock/si/fnm/...     │  │
//! │  │ - _cat/indices       │   └──────────────┬──────────────┘  │
//! │  │ - prefix/node filter │                  │                 │
//! │  └──────────┬───────────┘                  │                 │
//! │             └──────────────┬───────────────┘                 │
//! │                            │                                 │
//! │      ┌─────────────────────┼──────────────────────┐          │
//! │ ┌────▼──────────┐   ┌──────▼──────┐   ┌───────────▼────┐     │
//! │ │TopologySource │   │ FileSystem  │   │ ResidencyProbe │     │
//! │ └────┬──────────┘   └──────┬──────┘   └───────────┬────┘     │
//! └──────┼─────────────────────┼──────────────────────┼──────────┘
//!        │                     │                      │
//!  EsClient / MockTopology   RealFs / MockFs   MincoreProbe / MockProbe
//! ```
//!
//! # Usage
//!
//! ```
//! use pcstat_core::collector::mock::scenarios::{TYPICAL_INDICES_PATH, TYPICAL_NODE, TYPICAL_PREFIXES};
//! use pcstat_core::collector::{Collector, MockFs, MockProbe, MockTopology, ShardCatalogBuilder};
//!
//! let builder = ShardCatalogBuilder::new(TYPICAL_PREFIXES).with_node_filter(TYPICAL_NODE);
//! let mut collector = Collector::new(MockFs::typical_node(), MockProbe::typical_node(), TYPICAL_INDICES_PATH);
//! let stats = collector.collect(&MockTopology::typical_cluster(), &builder);
//! assert_eq!(stats.total().page_cache, 4143);
//! ```

#[allow(clippy::module_inception)]
mod collector;
pub mod mock;
pub mod probe;
pub mod suffix;
pub mod topology;
pub mod traits;

pub use collector::{Collector, CollectorTiming};
pub use mock::{MockFs, MockProbe, MockTopology};
pub use probe::{FileResidency, MincoreProbe, ProbeError, ResidencyProbe};
pub use suffix::{SuffixFilter, file_suffix};
pub use topology::{ShardCatalog, ShardCatalogBuilder, TopologyError, TopologySource};
pub use traits::{FileSystem, RealFs};
