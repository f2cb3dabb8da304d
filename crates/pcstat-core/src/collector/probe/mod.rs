//! Page-cache residency probing.
//!
//! A [`ResidencyProbe`] takes a batch of file paths and reports how many of
//! each file's pages are currently held in the OS page cache. The engine
//! calls it once per shard and matches results by path, never by position.

mod mincore;

pub use mincore::{MincoreProbe, to_standard_pages};

use std::path::PathBuf;

use thiserror::Error;

/// Residency of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileResidency {
    pub path: PathBuf,
    /// 4 KiB pages currently in the page cache.
    pub cached_pages: u64,
    /// 4 KiB pages spanned by the file.
    pub total_pages: u64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The probe cannot run on this platform.
    #[error("page cache probing is not supported on this platform")]
    Unsupported,
    /// The batch as a whole failed.
    #[error("probe failed: {0}")]
    Failed(String),
}

/// Reports page-cache residency for a batch of files.
pub trait ResidencyProbe {
    /// Probes every path in `paths`.
    ///
    /// Files that vanish between listing and probing are left out of the
    /// result rather than failing the batch. Result order is unspecified.
    fn probe(&self, paths: &[PathBuf]) -> Result<Vec<FileResidency>, ProbeError>;
}
