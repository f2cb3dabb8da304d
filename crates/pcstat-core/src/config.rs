//! Agent configuration loaded from a TOML file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::collector::ShardCatalogBuilder;
use crate::store::RetentionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub es: EsConfig,
    pub collection: CollectionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Cluster endpoint and the local node's data directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EsConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// The node's `indices` directory (`.../nodes/0/indices`).
    pub indices_path: PathBuf,
    /// Only shards on this node are measured; empty means all nodes.
    #[serde(default)]
    pub node_name: String,
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,
    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CollectionConfig {
    /// Index name prefixes to measure.
    pub indices_prefix: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub log: LogOutputConfig,
    #[serde(default)]
    pub es: EsOutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogOutputConfig {
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,
    /// Rotated files kept.
    #[serde(default = "default_keep_log_num")]
    pub keep_log_num: usize,
}

impl Default for LogOutputConfig {
    fn default() -> Self {
        Self {
            log_path: default_log_path(),
            keep_log_num: default_keep_log_num(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EsOutputConfig {
    /// Prefix of the dated reporting indices.
    #[serde(default = "default_pc_index_name")]
    pub pc_index_name: String,
    /// Days of reporting indices kept besides today.
    #[serde(default = "default_keep_index_num")]
    pub keep_index_num: u32,
}

impl Default for EsOutputConfig {
    fn default() -> Self {
        Self {
            pc_index_name: default_pc_index_name(),
            keep_index_num: default_keep_index_num(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    9200
}

fn default_cluster_name() -> String {
    "elasticsearch".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_log_path() -> PathBuf {
    PathBuf::from("pcstat.log")
}

fn default_pc_index_name() -> String {
    "pc_stat".to_string()
}

fn default_keep_log_num() -> usize {
    5
}

fn default_keep_index_num() -> u32 {
    5
}

impl FromStr for Config {
    type Err = ConfigError;

    /// Parses and validates.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Loads and validates a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.es.indices_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("es.indices_path is empty".to_string()));
        }
        if self.es.port == 0 {
            return Err(ConfigError::Invalid("es.port must be non-zero".to_string()));
        }
        if self.es.host.trim().is_empty() {
            return Err(ConfigError::Invalid("es.host is empty".to_string()));
        }
        if self.collection.indices_prefix.is_empty() {
            return Err(ConfigError::Invalid(
                "collection.indices_prefix must list at least one prefix".to_string(),
            ));
        }
        if self.output.es.pc_index_name.is_empty() {
            return Err(ConfigError::Invalid("output.es.pc_index_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.es.timeout_secs)
    }

    /// Catalog filters: configured prefixes plus the node filter.
    pub fn catalog_builder(&self) -> ShardCatalogBuilder {
        ShardCatalogBuilder::new(&self.collection.indices_prefix)
            .with_node_filter(self.es.node_name.trim())
    }

    pub fn retention(&self) -> RetentionConfig {
        RetentionConfig {
            index_prefix: self.output.es.pc_index_name.clone(),
            retention_days: self.output.es.keep_index_num,
        }
    }
}
