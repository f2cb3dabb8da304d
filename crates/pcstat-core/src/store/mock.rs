use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::{BulkItem, BulkResponse, ReportStore, StoreError};
use crate::model::PageCacheDoc;

/// In-memory reporting store.
#[derive(Debug, Default)]
pub struct MockStore {
    indices: RefCell<BTreeMap<String, Option<Value>>>,
    written: RefCell<Vec<(String, PageCacheDoc)>>,
    /// Index names whose documents are rejected item by item.
    rejected: BTreeSet<String>,
    created: Cell<usize>,
    fail_create: bool,
    lose_create_race: bool,
    fail_delete: bool,
    unreachable: bool,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `create_index` call fails.
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// `create_index` finds the index already created by another node:
    /// the index appears, the call still fails.
    pub fn losing_create_race(mut self) -> Self {
        self.lose_create_race = true;
        self
    }

    /// Every `delete_index` call fails.
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// Every call fails as if the cluster were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Bulk items for documents of `index_name` come back with status 400.
    pub fn rejecting(mut self, index_name: &str) -> Self {
        self.rejected.insert(index_name.to_string());
        self
    }

    /// Pre-existing index.
    pub fn add_index(&self, name: &str) {
        self.indices.borrow_mut().insert(name.to_string(), None);
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indices.borrow().contains_key(name)
    }

    pub fn index_names(&self) -> Vec<String> {
        self.indices.borrow().keys().cloned().collect()
    }

    /// Body the index was created with (None for pre-existing ones).
    pub fn schema(&self, name: &str) -> Option<Value> {
        self.indices.borrow().get(name).cloned().flatten()
    }

    pub fn created_count(&self) -> usize {
        self.created.get()
    }

    /// Accepted documents as (target index, doc).
    pub fn written(&self) -> Vec<(String, PageCacheDoc)> {
        self.written.borrow().clone()
    }

    fn reachable(&self) -> Result<(), StoreError> {
        if self.unreachable {
            return Err(StoreError::Status {
                status: 503,
                body: "no master".to_string(),
            });
        }
        Ok(())
    }
}

impl ReportStore for MockStore {
    fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        self.reachable()?;
        Ok(self.has_index(index))
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<(), StoreError> {
        self.reachable()?;
        if self.lose_create_race {
            self.add_index(index);
            return Err(StoreError::Status {
                status: 400,
                body: "resource_already_exists_exception".to_string(),
            });
        }
        if self.fail_create {
            return Err(StoreError::Status {
                status: 403,
                body: "cluster_block_exception".to_string(),
            });
        }
        self.indices
            .borrow_mut()
            .insert(index.to_string(), Some(body.clone()));
        self.created.set(self.created.get() + 1);
        Ok(())
    }

    fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        self.reachable()?;
        if self.fail_delete {
            return Err(StoreError::NotAcknowledged {
                operation: "delete",
                index: index.to_string(),
            });
        }
        self.indices.borrow_mut().remove(index);
        Ok(())
    }

    fn bulk(&self, index: &str, docs: &[PageCacheDoc]) -> Result<BulkResponse, StoreError> {
        self.reachable()?;
        let mut items = Vec::with_capacity(docs.len());
        for doc in docs {
            if self.rejected.contains(&doc.index_name) {
                items.push(BulkItem {
                    status: 400,
                    error: Some("mapper_parsing_exception: rejected".to_string()),
                });
            } else {
                self.written
                    .borrow_mut()
                    .push((index.to_string(), doc.clone()));
                items.push(BulkItem {
                    status: 201,
                    error: None,
                });
            }
        }
        Ok(BulkResponse { items })
    }
}
