//! Blocking HTTP client for the search cluster.
//!
//! One client serves both sides of the agent: the `_cat` listings the
//! catalog is built from, and the index lifecycle + `_bulk` calls of the
//! `es` sink.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;

use super::{BulkItem, BulkResponse, ReportStore, StoreError};
use crate::collector::topology::{TopologyError, TopologySource};
use crate::model::PageCacheDoc;

const SHARDS_PATH: &str = "_cat/shards?h=state,index,shard,node,prirep";
const INDICES_PATH: &str = "_cat/indices?h=index,uuid";

#[derive(Deserialize)]
struct Acknowledged {
    #[serde(default)]
    acknowledged: bool,
}

#[derive(Deserialize)]
struct RawBulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, RawBulkItem>>,
}

#[derive(Deserialize)]
struct RawBulkItem {
    status: u16,
    #[serde(default)]
    error: Option<RawBulkError>,
}

#[derive(Deserialize)]
struct RawBulkError {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    reason: String,
}

/// Decodes a `_bulk` response body into per-item outcomes.
pub fn parse_bulk_response(body: &str) -> Result<BulkResponse, StoreError> {
    let raw: RawBulkResponse = serde_json::from_str(body)?;
    let items = raw
        .items
        .into_iter()
        // Each item is keyed by its action ("index", "create", ...)
        .filter_map(|action| action.into_values().next())
        .map(|item| BulkItem {
            status: item.status,
            error: item.error.map(|e| format!("{}: {}", e.kind, e.reason)),
        })
        .collect();
    Ok(BulkResponse { items })
}

/// Builds the NDJSON body indexing every doc into `index`.
pub fn bulk_body(index: &str, docs: &[PageCacheDoc]) -> Result<String, StoreError> {
    let action = serde_json::json!({ "index": { "_index": index } }).to_string();
    let mut body = String::new();
    for doc in docs {
        let _ = writeln!(body, "{}", action);
        let _ = writeln!(body, "{}", serde_json::to_string(doc)?);
    }
    Ok(body)
}

/// HTTP client for one cluster endpoint.
#[derive(Debug, Clone)]
pub struct EsClient {
    base_url: String,
    http: Client,
}

impl EsClient {
    /// # Arguments
    /// * `host` - Cluster host name or address
    /// * `port` - HTTP port (usually 9200)
    /// * `timeout` - Per-request timeout
    pub fn new(host: &str, port: u16, timeout: Duration) -> Result<Self, StoreError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: format!("http://{}:{}", host, port),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get_text(&self, path: &str) -> Result<String, TopologyError> {
        let resp = self.http.get(self.url(path)).send()?;
        let status = resp.status();
        let body = resp.text()?;
        if !status.is_success() {
            return Err(TopologyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// Turns a non-success response into `StoreError::Status`.
    fn check(resp: Response) -> Result<Response, StoreError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn acknowledged(resp: Response, operation: &'static str, index: &str) -> Result<(), StoreError> {
        let ack: Acknowledged = serde_json::from_str(&Self::check(resp)?.text()?)?;
        if !ack.acknowledged {
            return Err(StoreError::NotAcknowledged {
                operation,
                index: index.to_string(),
            });
        }
        Ok(())
    }
}

impl TopologySource for EsClient {
    fn shard_listing(&self) -> Result<String, TopologyError> {
        self.get_text(SHARDS_PATH)
    }

    fn index_listing(&self) -> Result<String, TopologyError> {
        self.get_text(INDICES_PATH)
    }
}

impl ReportStore for EsClient {
    fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let resp = self.http.head(self.url(index)).send()?;
        match resp.status() {
            StatusCode::NOT_FOUND => Ok(false),
            _ => Self::check(resp).map(|_| true),
        }
    }

    fn create_index(&self, index: &str, body: &Value) -> Result<(), StoreError> {
        let resp = self.http.put(self.url(index)).json(body).send()?;
        Self::acknowledged(resp, "create", index)
    }

    fn delete_index(&self, index: &str) -> Result<(), StoreError> {
        let resp = self.http.delete(self.url(index)).send()?;
        Self::acknowledged(resp, "delete", index)
    }

    fn bulk(&self, index: &str, docs: &[PageCacheDoc]) -> Result<BulkResponse, StoreError> {
        let resp = self
            .http
            .post(self.url("_bulk"))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(bulk_body(index, docs)?)
            .send()?;
        parse_bulk_response(&Self::check(resp)?.text()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn doc(index: &str, primary: bool) -> PageCacheDoc {
        PageCacheDoc {
            cache: BTreeMap::from([("doc".to_string(), 3), ("total".to_string(), 3)]),
            primary,
            cluster_name: "c1".to_string(),
            node_name: "n1".to_string(),
            index_name: index.to_string(),
            created: Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_bulk_body_is_ndjson() {
        let body = bulk_body("pc_stat-2026_03_14", &[doc("a", true), doc("a", false)]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "pc_stat-2026_03_14");
        let source: Value = serde_json::from_str(lines[3]).unwrap();
        assert_eq!(source["primary"], false);
        assert_eq!(source["cache"]["total"], 3);
    }

    #[test]
    fn test_parse_bulk_response_partial_failure() {
        let body = r#"{
            "took": 12,
            "errors": true,
            "items": [
                {"index": {"_index": "pc", "_id": "1", "status": 201}},
                {"index": {"_index": "pc", "status": 400,
                    "error": {"type": "mapper_parsing_exception", "reason": "failed to parse field [created]"}}},
                {"create": {"_index": "pc", "_id": "3", "status": 200}}
            ]
        }"#;
        let resp = parse_bulk_response(body).unwrap();
        assert_eq!(resp.items.len(), 3);

        let failures: Vec<_> = resp.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 1);
        assert_eq!(
            failures[0].1.error.as_deref(),
            Some("mapper_parsing_exception: failed to parse field [created]")
        );
    }

    #[test]
    fn test_parse_bulk_response_garbage() {
        assert!(matches!(
            parse_bulk_response("<html>bad gateway</html>"),
            Err(StoreError::Decode(_))
        ));
    }

    #[test]
    fn test_client_base_url() {
        let client = EsClient::new("10.0.0.7", 9200, Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.7:9200");
        assert_eq!(client.url(SHARDS_PATH), "http://10.0.0.7:9200/_cat/shards?h=state,index,shard,node,prirep");
    }

    #[test]
    fn test_unreachable_cluster_is_request_error() {
        // Port 1 on localhost refuses connections
        let client = EsClient::new("127.0.0.1", 1, Duration::from_secs(2)).unwrap();
        assert!(matches!(client.shard_listing(), Err(TopologyError::Request(_))));
        let err = client.index_exists("x").unwrap_err();
        assert!(matches!(err, StoreError::Request(_)));
        // The transport error stays reachable as the source
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.downcast_ref::<reqwest::Error>().unwrap().is_connect());
    }
}
