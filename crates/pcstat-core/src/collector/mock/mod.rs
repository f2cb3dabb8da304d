//! Mock collaborators for testing without a cluster, real shards or Linux.
//!
//! - [`MockFs`]: in-memory directory tree
//! - [`MockProbe`]: residency from a fixed table
//! - [`MockTopology`]: canned `_cat` listings
//! - [`scenarios`]: a ready-made two-node cluster

mod filesystem;
mod probe;
pub mod scenarios;

pub use filesystem::MockFs;
pub use probe::{MockProbe, MockTopology};
