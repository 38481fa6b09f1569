use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use anyhow::{Context, Result};
use memmap2::Mmap;

/// Threshold in bytes above which we attempt to use mmap for reading.
/// Callers can override via API; this is a reasonable default.
pub const DEFAULT_MMAP_THRESHOLD_BYTES: u64 = 16 * 1024 * 1024; // 16 MiB

pub type DocumentReader = Box<dyn BufRead>;

/// Decide whether to use mmap based on file size and threshold.
pub fn should_use_mmap(file_size_bytes: u64, threshold_bytes: u64) -> bool {
    file_size_bytes >= threshold_bytes
}

/// Open a document through a buffered reader (non-mmap).
pub fn open_bufread<P: AsRef<Path>>(path: P) -> Result<DocumentReader> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    Ok(Box::new(BufReader::new(file)))
}

/// Open a document through a read-only memory map. Pages are faulted in as the
/// parser advances, so the whole file is never copied onto the heap.
pub fn open_mmap<P: AsRef<Path>>(path: P) -> Result<DocumentReader> {
    let file = File::open(&path).with_context(|| format!("open {}", path.as_ref().display()))?;
    let mmap =
        unsafe { Mmap::map(&file) }.with_context(|| format!("mmap {}", path.as_ref().display()))?;
    Ok(Box::new(Cursor::new(mmap)))
}

/// Choose mmap or bufread based on the file size.
pub fn open_auto<P: AsRef<Path>>(path: P, threshold_bytes: u64) -> Result<DocumentReader> {
    let meta =
        std::fs::metadata(&path).with_context(|| format!("stat {}", path.as_ref().display()))?;
    if meta.is_file() && meta.len() > 0 && should_use_mmap(meta.len(), threshold_bytes) {
        open_mmap(path)
    } else {
        open_bufread(path)
    }
}
