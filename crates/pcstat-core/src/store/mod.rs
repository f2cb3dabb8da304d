//! Reporting store: the time-series search index the `es` sink writes to.
//!
//! [`ReportStore`] is the capability the sink and the retention manager
//! need. [`EsClient`] implements it over HTTP (and also serves the `_cat`
//! topology listings); [`MockStore`] keeps everything in memory.

mod client;
mod mock;
mod retention;

pub use client::{EsClient, bulk_body, parse_bulk_response};
pub use mock::MockStore;
pub use retention::{
    INDEX_DATE_FORMAT, RetentionConfig, RetentionManager, RetentionResult, dated_index_name,
    index_schema,
};

use serde_json::Value;
use thiserror::Error;

use crate::model::PageCacheDoc;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("store request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The store answered with a non-success status.
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The store accepted the request but did not acknowledge it.
    #[error("{operation} of index {index} not acknowledged")]
    NotAcknowledged { operation: &'static str, index: String },
    /// The response body could not be understood.
    #[error("cannot decode store response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Outcome of one document in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItem {
    pub status: u16,
    /// `type: reason` of a rejected document.
    pub error: Option<String>,
}

impl BulkItem {
    pub fn is_success(&self) -> bool {
        self.error.is_none() && (200..300).contains(&self.status)
    }
}

/// Per-item outcome of a bulk write, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkResponse {
    pub items: Vec<BulkItem>,
}

impl BulkResponse {
    /// Items the store rejected, with their position in the request.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &BulkItem)> {
        self.items.iter().enumerate().filter(|(_, i)| !i.is_success())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

/// Index lifecycle and bulk write primitives of the reporting store.
pub trait ReportStore {
    fn index_exists(&self, index: &str) -> Result<bool, StoreError>;

    /// Creates `index` with the given settings/mappings body.
    fn create_index(&self, index: &str, body: &Value) -> Result<(), StoreError>;

    fn delete_index(&self, index: &str) -> Result<(), StoreError>;

    /// Writes `docs` into `index` in one request.
    fn bulk(&self, index: &str, docs: &[PageCacheDoc]) -> Result<BulkResponse, StoreError>;
}
