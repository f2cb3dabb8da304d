//! Cluster topology: where shards live and which storage uuid each index has.
//!
//! The raw listings come from a [`TopologySource`] (the cluster's `_cat`
//! endpoints in production, [`MockTopology`](crate::collector::mock::MockTopology)
//! in tests). [`ShardCatalogBuilder`] turns them into the joined catalog the
//! aggregation engine measures.

mod catalog;
pub mod parser;

pub use catalog::{IndexCatalog, ShardCatalog, ShardCatalogBuilder};
pub use parser::{IndexRow, ParseError, ShardRow, parse_index_listing, parse_shard_listing};

use thiserror::Error;

/// Failure to fetch a listing.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("topology request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("topology endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Source of the raw shard and index listings.
pub trait TopologySource {
    /// Text of `_cat/shards?h=state,index,shard,node,prirep`.
    fn shard_listing(&self) -> Result<String, TopologyError>;

    /// Text of `_cat/indices?h=index,uuid`.
    fn index_listing(&self) -> Result<String, TopologyError>;
}
