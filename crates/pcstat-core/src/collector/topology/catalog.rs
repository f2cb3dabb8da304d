//! Joins shard placement with index identity into the per-cycle catalog.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::parser::{parse_index_listing, parse_shard_listing};
use super::{ParseError, TopologySource};
use crate::model::Shard;

/// Started shard copies keyed by `index|shard|node`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardCatalog {
    shards: BTreeMap<String, Shard>,
}

impl ShardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, shard: Shard) {
        self.shards.insert(shard.key(), shard);
    }

    pub fn get(&self, key: &str) -> Option<&Shard> {
        self.shards.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}

impl IntoIterator for ShardCatalog {
    type Item = Shard;
    type IntoIter = std::collections::btree_map::IntoValues<String, Shard>;

    fn into_iter(self) -> Self::IntoIter {
        self.shards.into_values()
    }
}

impl FromIterator<Shard> for ShardCatalog {
    fn from_iter<I: IntoIterator<Item = Shard>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for shard in iter {
            catalog.insert(shard);
        }
        catalog
    }
}

/// Index name -> storage uuid, restricted to the configured prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexCatalog {
    uuids: HashMap<String, String>,
}

impl IndexCatalog {
    pub fn uuid(&self, index: &str) -> Option<&str> {
        self.uuids.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.uuids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uuids.is_empty()
    }
}

/// Builds the joined shard catalog from raw listings.
#[derive(Debug, Clone)]
pub struct ShardCatalogBuilder {
    prefixes: Vec<String>,
    node_filter: Option<String>,
}

impl ShardCatalogBuilder {
    /// # Arguments
    /// * `prefixes` - Index name prefixes to collect (prefix match)
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            node_filter: None,
        }
    }

    /// Keeps only shards placed on `node`. An empty name disables the filter.
    pub fn with_node_filter(mut self, node: impl Into<String>) -> Self {
        let node = node.into();
        self.node_filter = (!node.is_empty()).then_some(node);
        self
    }

    pub fn node_filter(&self) -> Option<&str> {
        self.node_filter.as_deref()
    }

    fn matches_prefix(&self, index: &str) -> bool {
        self.prefixes.iter().any(|p| index.starts_with(p.as_str()))
    }

    /// Parses the shard listing into the unjoined catalog.
    pub fn shard_catalog(&self, listing: &str) -> Result<ShardCatalog, ParseError> {
        Ok(parse_shard_listing(listing)?
            .into_iter()
            .map(|row| Shard::new(row.index, row.shard, row.node, row.primary))
            .collect())
    }

    /// Parses the index listing, keeping names that match a prefix.
    pub fn index_catalog(&self, listing: &str) -> Result<IndexCatalog, ParseError> {
        let uuids = parse_index_listing(listing)?
            .into_iter()
            .filter(|row| self.matches_prefix(&row.name))
            .map(|row| (row.name, row.uuid))
            .collect();
        Ok(IndexCatalog { uuids })
    }

    /// Produces a new catalog with uuids filled in.
    ///
    /// A shard is dropped when its index is not in `indices` or when the
    /// node filter is set and does not match its node.
    pub fn join(&self, shards: ShardCatalog, indices: &IndexCatalog) -> ShardCatalog {
        shards
            .into_iter()
            .filter(|shard| {
                self.node_filter
                    .as_deref()
                    .is_none_or(|node| shard.node_name == node)
            })
            .filter_map(|mut shard| {
                let uuid = indices.uuid(&shard.index_name)?;
                shard.uuid = uuid.to_string();
                Some(shard)
            })
            .collect()
    }

    /// Fetches both listings and joins them.
    ///
    /// A listing that cannot be fetched or parsed is logged and treated as
    /// empty, which yields an empty catalog for this cycle.
    pub fn build<T: TopologySource>(&self, source: &T) -> ShardCatalog {
        let indices = match source.index_listing() {
            Ok(text) => self.index_catalog(&text).unwrap_or_else(|e| {
                warn!("Index listing parse failed: {}", e);
                IndexCatalog::default()
            }),
            Err(e) => {
                warn!("Index listing fetch failed: {}", e);
                IndexCatalog::default()
            }
        };

        let shards = match source.shard_listing() {
            Ok(text) => self.shard_catalog(&text).unwrap_or_else(|e| {
                warn!("Shard listing parse failed: {}", e);
                ShardCatalog::default()
            }),
            Err(e) => {
                warn!("Shard listing fetch failed: {}", e);
                ShardCatalog::default()
            }
        };

        let started = shards.len();
        let joined = self.join(shards, &indices);
        debug!(
            "Catalog: {} indices matched, {} started shards, {} kept",
            indices.len(),
            started,
            joined.len()
        );
        joined
    }
}
