//! Dated reporting indices: one per day, created on demand, expired after
//! a fixed number of days.

use chrono::{Days, NaiveDate};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use super::{ReportStore, StoreError};

/// Date part of a reporting index name (`pc_stat-2026_03_14`).
pub const INDEX_DATE_FORMAT: &str = "%Y_%m_%d";

/// `<prefix>-YYYY_MM_DD`.
pub fn dated_index_name(prefix: &str, date: NaiveDate) -> String {
    format!("{}-{}", prefix, date.format(INDEX_DATE_FORMAT))
}

/// Settings and mappings a reporting index is created with.
pub fn index_schema() -> Value {
    json!({
        "settings": {
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                "cluster_name": { "type": "keyword" },
                "node_name": { "type": "keyword" },
                "index_name": { "type": "keyword" },
                "created": { "type": "date" }
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionConfig {
    pub index_prefix: String,
    /// Days of history kept besides today.
    pub retention_days: u32,
}

/// What [`RetentionManager::prepare`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionResult {
    /// Index the day's documents go to.
    pub index: String,
    /// The index did not exist and was created.
    pub created: bool,
    /// Expired index that was deleted.
    pub deleted: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RetentionManager {
    config: RetentionConfig,
}

impl RetentionManager {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn index_for(&self, date: NaiveDate) -> String {
        dated_index_name(&self.config.index_prefix, date)
    }

    /// The one index that falls out of retention on `today`.
    ///
    /// Only the day exactly `retention_days + 1` back is removed; older
    /// leftovers are not searched for.
    pub fn expired_index(&self, today: NaiveDate) -> Option<String> {
        today
            .checked_sub_days(Days::new(u64::from(self.config.retention_days) + 1))
            .map(|date| self.index_for(date))
    }

    /// Makes sure today's index exists and drops the expired one.
    ///
    /// Fails only when today's index can be neither found nor created; the
    /// caller must then skip the write. Deletion problems are logged.
    pub fn prepare<S: ReportStore + ?Sized>(
        &self,
        store: &S,
        today: NaiveDate,
    ) -> Result<RetentionResult, StoreError> {
        let index = self.index_for(today);
        let mut created = false;
        if !store.index_exists(&index)? {
            match store.create_index(&index, &index_schema()) {
                Ok(()) => {
                    info!("Created reporting index {}", index);
                    created = true;
                }
                // Nodes sharing the cluster race to create the day's index
                Err(e) if store.index_exists(&index).unwrap_or(false) => {
                    debug!("Reporting index {} created by another node: {}", index, e);
                }
                Err(e) => return Err(e),
            }
        }

        let deleted = self
            .expired_index(today)
            .and_then(|expired| self.delete_expired(store, expired));

        Ok(RetentionResult {
            index,
            created,
            deleted,
        })
    }

    fn delete_expired<S: ReportStore + ?Sized>(&self, store: &S, expired: String) -> Option<String> {
        match store.index_exists(&expired) {
            Ok(false) => {
                debug!("No expired index {}", expired);
                None
            }
            Ok(true) => match store.delete_index(&expired) {
                Ok(()) => {
                    info!("Deleted expired reporting index {}", expired);
                    Some(expired)
                }
                Err(e) => {
                    warn!("Failed to delete expired index {}: {}", expired, e);
                    None
                }
            },
            Err(e) => {
                warn!("Cannot check expired index {}: {}", expired, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockStore;

    fn manager(days: u32) -> RetentionManager {
        RetentionManager::new(RetentionConfig {
            index_prefix: "pc_stat".to_string(),
            retention_days: days,
        })
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_index_names() {
        assert_eq!(dated_index_name("pc_stat", date(2026, 3, 4)), "pc_stat-2026_03_04");
        let m = manager(5);
        assert_eq!(m.expired_index(date(2026, 3, 4)).as_deref(), Some("pc_stat-2026_02_26"));
        assert_eq!(manager(0).expired_index(date(2026, 1, 1)).as_deref(), Some("pc_stat-2025_12_31"));
    }

    #[test]
    fn test_schema_keeps_no_replicas() {
        let schema = index_schema();
        assert_eq!(schema["settings"]["number_of_replicas"], 0);
        assert_eq!(schema["mappings"]["properties"]["created"]["type"], "date");
        assert_eq!(schema["mappings"]["properties"]["node_name"]["type"], "keyword");
    }

    #[test]
    fn test_prepare_creates_today_and_drops_expired() {
        let store = MockStore::new();
        store.add_index("pc_stat-2026_03_08");
        store.add_index("pc_stat-2026_03_07");

        let result = manager(5).prepare(&store, date(2026, 3, 14)).unwrap();
        assert_eq!(result.index, "pc_stat-2026_03_14");
        assert!(result.created);
        assert_eq!(result.deleted.as_deref(), Some("pc_stat-2026_03_08"));

        assert!(store.has_index("pc_stat-2026_03_14"));
        assert!(!store.has_index("pc_stat-2026_03_08"));
        // Older than the expiry day: left alone
        assert!(store.has_index("pc_stat-2026_03_07"));
        assert_eq!(store.schema("pc_stat-2026_03_14"), Some(index_schema()));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let store = MockStore::new();
        let m = manager(5);
        m.prepare(&store, date(2026, 3, 14)).unwrap();
        let again = m.prepare(&store, date(2026, 3, 14)).unwrap();
        assert!(!again.created);
        assert_eq!(again.deleted, None);
        assert_eq!(store.created_count(), 1);
    }

    #[test]
    fn test_create_failure_is_error() {
        let store = MockStore::new().failing_create();
        let err = manager(5).prepare(&store, date(2026, 3, 14));
        assert!(err.is_err());
        assert!(!store.has_index("pc_stat-2026_03_14"));
    }

    #[test]
    fn test_create_lost_to_another_node_still_writes() {
        let store = MockStore::new().losing_create_race();
        let result = manager(5).prepare(&store, date(2026, 3, 14)).unwrap();
        assert_eq!(result.index, "pc_stat-2026_03_14");
        assert!(!result.created);
        assert!(store.has_index("pc_stat-2026_03_14"));
    }

    #[test]
    fn test_delete_failure_is_ignored() {
        let store = MockStore::new().failing_delete();
        store.add_index("pc_stat-2026_03_08");

        let result = manager(5).prepare(&store, date(2026, 3, 14)).unwrap();
        assert_eq!(result.deleted, None);
        assert!(store.has_index("pc_stat-2026_03_08"));
        assert!(store.has_index("pc_stat-2026_03_14"));
    }
}
