//! In-memory mock filesystem for testing the collector without real shards.

use crate::collector::traits::FileSystem;
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

/// In-memory filesystem for testing.
///
/// Only the tree shape matters to the collector, so files carry no content.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: HashSet<PathBuf>,
    directories: HashSet<PathBuf>,
    /// Directories that exist but refuse to be listed.
    unreadable: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file. Parent directories are created automatically.
    pub fn add_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path);
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Makes `read_dir` on `path` fail with `PermissionDenied`.
    pub fn deny_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_dir(&path);
        self.unreadable.insert(path);
    }

    /// Adds every file name under `dir`.
    pub fn add_files<'a>(&mut self, dir: impl AsRef<Path>, names: impl IntoIterator<Item = &'a str>) {
        let dir = dir.as_ref();
        self.add_dir(dir);
        for name in names {
            self.add_file(dir.join(name));
        }
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }
}

impl FileSystem for MockFs {
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if self.unreadable.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("permission denied: {}", path.display()),
            ));
        }
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", path.display()),
            ));
        }

        let mut entries: Vec<PathBuf> = self
            .files
            .iter()
            .chain(self.directories.iter())
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }
}
