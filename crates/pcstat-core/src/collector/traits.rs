//! Filesystem seam of the collector.
//!
//! Only shard directory enumeration goes through it. `RealFs` backs it with
//! `std::fs`; `MockFs` keeps an in-memory tree for tests.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction for the filesystem operations the collector performs.
pub trait FileSystem {
    /// Lists entries in a directory.
    ///
    /// # Returns
    /// Full paths of the entries, or an I/O error if the directory cannot
    /// be read (missing, permission denied, relocated shard).
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Returns `true` if `path` is a regular file.
    fn is_file(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
