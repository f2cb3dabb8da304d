//! Pre-built mock cluster for testing.
//!
//! Two nodes, three indices. Seen from `node-1` with prefixes
//! `["logs-", "metrics-"]`, the expected measurement is:
//!
//! | index             | total | primary | replica |
//! |-------------------|-------|---------|---------|
//! | `logs-2026.03.01` | 1839  | 1326    | 513     |
//! | `metrics-app`     | 2304  | 2304    | 0       |
//! | total             | 4143  | 3630    | 513     |
//!
//! (pages; `.kibana` is outside the prefixes, `node-2` copies are filtered)

use std::path::{Path, PathBuf};

use super::filesystem::MockFs;
use super::probe::{MockProbe, MockTopology};

pub const TYPICAL_INDICES_PATH: &str = "/var/lib/elasticsearch/nodes/0/indices";
pub const TYPICAL_NODE: &str = "node-1";
pub const TYPICAL_PREFIXES: [&str; 2] = ["logs-", "metrics-"];

const LOGS_UUID: &str = "Zq0b9xU3RHu1t0Yw8l2K5A";
const METRICS_UUID: &str = "mT4c7PzqS2e3oV1nXr6JbQ";
const KIBANA_UUID: &str = "k1BaNaUuIdNoTcOlLeCtEd";

/// (uuid, shard, file, cached pages) for every shard copy on `node-1`.
const NODE_FILES: &[(&str, &str, &str, u64)] = &[
    (LOGS_UUID, "0", "_0.cfs", 1024),
    (LOGS_UUID, "0", "_0.si", 9),
    (LOGS_UUID, "0", "write.lock", 1),
    (LOGS_UUID, "0", "segments_3", 2),
    (LOGS_UUID, "0", "_1.fdt", 300),
    (LOGS_UUID, "1", "_0.cfs", 512),
    (LOGS_UUID, "1", "_0.cfe", 5),
    (LOGS_UUID, "1", "segments_2", 1),
    (METRICS_UUID, "0", "_0.dvd", 2048),
    (METRICS_UUID, "0", "_0.tim", 256),
    (METRICS_UUID, "0", "_0.fnm", 3),
    (KIBANA_UUID, "0", "_0.cfs", 64),
];

fn node_file(uuid: &str, shard: &str, name: &str) -> PathBuf {
    Path::new(TYPICAL_INDICES_PATH)
        .join(uuid)
        .join(shard)
        .join("index")
        .join(name)
}

impl MockTopology {
    /// `_cat` listings of the typical cluster.
    pub fn typical_cluster() -> Self {
        Self::new(
            "\
STARTED    logs-2026.03.01 0 node-1 p
STARTED    logs-2026.03.01 1 node-1 r
STARTED    logs-2026.03.01 0 node-2 r
STARTED    logs-2026.03.01 1 node-2 p
STARTED    metrics-app     0 node-1 p
RELOCATING metrics-app     1 node-1 p
UNASSIGNED metrics-app     1        r
STARTED    .kibana         0 node-1 p
",
            format!(
                "\
logs-2026.03.01 {LOGS_UUID}
metrics-app     {METRICS_UUID}
.kibana         {KIBANA_UUID}
"
            ),
        )
    }
}

impl MockFs {
    /// Shard directories of `node-1` in the typical cluster.
    pub fn typical_node() -> Self {
        let mut fs = Self::new();
        for (uuid, shard, name, _) in NODE_FILES {
            fs.add_file(node_file(uuid, shard, name));
        }
        fs
    }
}

impl MockProbe {
    /// Residency of every file of `node-1` in the typical cluster.
    pub fn typical_node() -> Self {
        let mut probe = Self::new();
        for (uuid, shard, name, pages) in NODE_FILES {
            probe.set(node_file(uuid, shard, name), *pages);
        }
        probe
    }
}
