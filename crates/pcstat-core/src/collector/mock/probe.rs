//! Deterministic residency probe and topology source for tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::collector::probe::{FileResidency, ProbeError, ResidencyProbe};
use crate::collector::topology::{TopologyError, TopologySource};

/// Probe answering from a fixed path -> cached pages table.
///
/// Paths not in the table are treated as vanished files and left out of
/// the result, like the real probe does. Results come back in reverse
/// input order so callers cannot depend on ordering.
#[derive(Debug, Default)]
pub struct MockProbe {
    residency: HashMap<PathBuf, u64>,
    fail: bool,
    calls: Cell<usize>,
    probed: RefCell<Vec<PathBuf>>,
}

impl MockProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cached page count reported for `path`.
    pub fn set(&mut self, path: impl AsRef<Path>, cached_pages: u64) {
        self.residency
            .insert(path.as_ref().to_path_buf(), cached_pages);
    }

    /// Makes every batch fail.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Number of `probe` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Every path passed to `probe`, across all calls.
    pub fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.borrow().clone()
    }
}

impl ResidencyProbe for MockProbe {
    fn probe(&self, paths: &[PathBuf]) -> Result<Vec<FileResidency>, ProbeError> {
        self.calls.set(self.calls.get() + 1);
        self.probed.borrow_mut().extend(paths.iter().cloned());
        if self.fail {
            return Err(ProbeError::Failed("mock probe failure".to_string()));
        }

        Ok(paths
            .iter()
            .rev()
            .filter_map(|path| {
                self.residency.get(path).map(|&cached| FileResidency {
                    path: path.clone(),
                    cached_pages: cached,
                    total_pages: cached,
                })
            })
            .collect())
    }
}

/// Topology source returning canned listings.
#[derive(Debug, Clone, Default)]
pub struct MockTopology {
    shards: String,
    indices: String,
    fail_shards: bool,
    fail_indices: bool,
}

impl MockTopology {
    pub fn new(shards: impl Into<String>, indices: impl Into<String>) -> Self {
        Self {
            shards: shards.into(),
            indices: indices.into(),
            ..Self::default()
        }
    }

    pub fn failing_shard_listing(mut self) -> Self {
        self.fail_shards = true;
        self
    }

    pub fn failing_index_listing(mut self) -> Self {
        self.fail_indices = true;
        self
    }
}

impl TopologySource for MockTopology {
    fn shard_listing(&self) -> Result<String, TopologyError> {
        if self.fail_shards {
            return Err(TopologyError::Status {
                status: 503,
                body: "no master".to_string(),
            });
        }
        Ok(self.shards.clone())
    }

    fn index_listing(&self) -> Result<String, TopologyError> {
        if self.fail_indices {
            return Err(TopologyError::Status {
                status: 503,
                body: "cluster not ready".to_string(),
            });
        }
        Ok(self.indices.clone())
    }
}
