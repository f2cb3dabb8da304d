//! File suffix extraction and the low-value suffix filter.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Suffixes that hold little cache-relevant data: lock files, segment
/// generation markers and small per-segment metadata.
pub const FILTERED_SUFFIXES: [&str; 10] = [
    "lock",
    "SEGMENT_N",
    "si",
    "cfe",
    "liv",
    "dvm",
    "nvm",
    "dii",
    "fdx",
    "fnm",
];

/// Bucket for files without an extension (e.g. `segments_5`).
pub const OTHER_SUFFIX: &str = "other";

/// Returns the text after the last `.` of the file name, or `"other"`.
///
/// Only the final path component is inspected, and a leading dot counts as
/// a separator (`.hidden` -> `hidden`).
pub fn file_suffix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(pos) if pos + 1 < name.len() => name[pos + 1..].to_string(),
        _ => OTHER_SUFFIX.to_string(),
    }
}

/// Drops files whose suffix is in a fixed exclusion set.
#[derive(Debug, Clone)]
pub struct SuffixFilter {
    excluded: HashSet<String>,
}

impl Default for SuffixFilter {
    fn default() -> Self {
        Self::new(FILTERED_SUFFIXES)
    }
}

impl SuffixFilter {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        self.excluded.contains(&file_suffix(path))
    }

    /// Keeps only files worth probing, preserving input order.
    pub fn retain(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        files.into_iter().filter(|f| !self.is_excluded(f)).collect()
    }
}
