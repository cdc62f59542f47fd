//! Cache types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Metadata for one regular file found under the cache root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Directory holding the file; the unit of deletion
    pub parent: PathBuf,
    pub size: u64,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
}

impl FileRecord {
    /// Build a record from a path and its stat results.
    ///
    /// Returns `None` for paths without a parent or a UTF-8 file name.
    pub fn new(path: PathBuf, size: u64, created_at: DateTime<Utc>) -> Option<Self> {
        let parent = path.parent()?.to_path_buf();
        let file_name = path.file_name()?.to_str()?.to_string();
        Some(Self {
            path,
            parent,
            size,
            created_at,
            file_name,
        })
    }

    /// Whether deleting this record's parent would remove the cache root itself
    pub fn is_root_level(&self, root: &Path) -> bool {
        self.parent == root
    }
}

/// Files captured by one full scan of the cache root.
///
/// Each scan builds a fresh snapshot; it is never patched in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    files: Vec<FileRecord>,
    total_size: u64,
}

impl CacheSnapshot {
    pub fn new(files: Vec<FileRecord>) -> Self {
        let total_size = files.iter().map(|f| f.size).sum();
        Self { files, total_size }
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileRecord> for CacheSnapshot {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Result of one batch of concurrent directory deletions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionOutcome {
    pub removed: usize,
    pub failed: usize,
}

/// Summary of a one-shot eviction run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvictionReport {
    pub expired_directories: Option<usize>,
    pub size_before: Option<u64>,
    pub bytes_released: Option<u64>,
}
