//! `mincore(2)` based residency probe.
//!
//! Each file is mapped with `PROT_NONE` (no page is touched, so probing does
//! not pull data into the cache) and `mincore` fills one byte per page whose
//! lowest bit tells whether the page is resident. Counts are reported in
//! 4 KiB pages whatever the kernel page size is.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::{FileResidency, ProbeError, ResidencyProbe};
use crate::fmt::PAGE_BYTES;

/// Production probe for Linux.
#[derive(Debug, Clone, Copy)]
pub struct MincoreProbe {
    page_size: u64,
}

impl Default for MincoreProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MincoreProbe {
    pub fn new() -> Self {
        Self {
            page_size: system_page_size(),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}

impl ResidencyProbe for MincoreProbe {
    fn probe(&self, paths: &[PathBuf]) -> Result<Vec<FileResidency>, ProbeError> {
        if !cfg!(target_os = "linux") {
            return Err(ProbeError::Unsupported);
        }

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            match file_residency(path, self.page_size) {
                Ok(residency) => results.push(residency),
                // Segment merges delete files between listing and probing
                Err(e) => debug!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(results)
    }
}

/// Converts a count of `page_size` pages into 4 KiB pages.
pub fn to_standard_pages(pages: u64, page_size: u64) -> u64 {
    pages.saturating_mul(page_size) / PAGE_BYTES
}

#[cfg(target_os = "linux")]
fn system_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions and only reads system config.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as u64 } else { 4096 }
}

#[cfg(not(target_os = "linux"))]
fn system_page_size() -> u64 {
    4096
}

#[cfg(target_os = "linux")]
fn file_residency(path: &Path, page_size: u64) -> std::io::Result<FileResidency> {
    use std::fs::File;
    use std::os::fd::AsRawFd;

    let file = File::open(path)?;
    let size = file.metadata()?.len();
    if size == 0 {
        return Ok(FileResidency {
            path: path.to_path_buf(),
            cached_pages: 0,
            total_pages: 0,
        });
    }

    let len = usize::try_from(size)
        .map_err(|_| std::io::Error::other("file too large to map"))?;
    let native_pages = size.div_ceil(page_size);

    // SAFETY: fd is a valid open descriptor for the lifetime of `file`, len is
    // the non-zero file length and the mapping is never dereferenced.
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_NONE,
            libc::MAP_SHARED,
            file.as_raw_fd(),
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        return Err(std::io::Error::last_os_error());
    }

    let mut pages = vec![0u8; native_pages as usize];
    // SAFETY: addr/len describe the mapping created above and `pages` holds
    // one byte per page of that range.
    let rc = unsafe { libc::mincore(addr, len, pages.as_mut_ptr()) };
    let mincore_err = (rc != 0).then(std::io::Error::last_os_error);

    // SAFETY: unmapping exactly the region returned by mmap.
    unsafe {
        libc::munmap(addr, len);
    }

    if let Some(e) = mincore_err {
        return Err(e);
    }

    let resident = pages.iter().filter(|b| **b & 1 == 1).count() as u64;
    Ok(FileResidency {
        path: path.to_path_buf(),
        cached_pages: to_standard_pages(resident, page_size),
        total_pages: to_standard_pages(native_pages, page_size),
    })
}

#[cfg(not(target_os = "linux"))]
fn file_residency(_path: &Path, _page_size: u64) -> std::io::Result<FileResidency> {
    Err(std::io::Error::from(std::io::ErrorKind::Unsupported))
}


#[cfg(all(test, target_os = "linux"))]
mod linux_tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_probe_counts_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_0.fdt");
        let probe = MincoreProbe::new();
        let size = probe.page_size() as usize * 3 + 10;
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![7u8; size]).unwrap();
        f.sync_all().unwrap();

        let results = probe.probe(std::slice::from_ref(&path)).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, path);
        let expected = to_standard_pages(4, probe.page_size());
        assert_eq!(results[0].total_pages, expected);
        assert!(results[0].cached_pages <= expected);
    }

    #[test]
    fn test_probe_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.doc");
        std::fs::write(&path, b"").unwrap();

        let results = MincoreProbe::new().probe(&[path]).unwrap();
        assert_eq!(results[0].total_pages, 0);
        assert_eq!(results[0].cached_pages, 0);
    }

    #[test]
    fn test_probe_skips_missing_files() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.tim");
        std::fs::write(&present, b"terms").unwrap();
        let missing = dir.path().join("merged-away.tim");

        let results = MincoreProbe::new().probe(&[missing, present.clone()]).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, present);
    }
}
