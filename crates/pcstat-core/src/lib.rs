//! pcstat-core: page-cache residency of search-cluster shards.
//!
//! Provides:
//! - `collector`: shard catalog, suffix filter, residency probe, aggregation
//! - `model`: shards, per-index stats and the report document
//! - `store`: reporting store client and dated-index retention
//! - `sink`: console, structured log and store outputs
//! - `scheduler`: fixed-cadence collect/report loop
//! - `agent`: all of the above wired into one cycle
//! - `config`: TOML configuration
//! - `fmt`: size and duration formatting for log lines

pub mod agent;
pub mod collector;
pub mod config;
pub mod fmt;
pub mod model;
pub mod scheduler;
pub mod sink;
pub mod store;
