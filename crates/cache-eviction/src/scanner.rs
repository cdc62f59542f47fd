//! Streaming recursive directory scan
//!
//! A blocking `walkdir` traversal feeds paths into a bounded channel while the
//! async side stats them through the [`BoundedExecutor`], so traversal and
//! stat I/O overlap and the full listing is never held in memory.

use crate::error::{EvictionError, Result};
use crate::executor::{receiver_stream, BoundedExecutor};
use crate::types::FileRecord;
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::mpsc;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Paths buffered between the walker thread and the stat stage
const WALK_CHANNEL_CAPACITY: usize = 1024;

/// Streams [`FileRecord`]s for every regular file under a root
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    root: PathBuf,
    executor: BoundedExecutor,
}

impl DirectoryScanner {
    pub fn new(root: PathBuf, executor: BoundedExecutor) -> Self {
        Self { root, executor }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a scan.
    ///
    /// Fails only if the root is missing or not a directory. Entries that
    /// cannot be listed or stat'ed are skipped.
    pub async fn scan(&self) -> Result<impl Stream<Item = FileRecord> + Send + 'static> {
        ensure_directory(&self.root).await?;

        let (tx, rx) = mpsc::channel(WALK_CHANNEL_CAPACITY);
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || walk(root, tx));

        Ok(stat_paths(&self.executor, receiver_stream(rx)))
    }

    /// Sum the size of every regular file under the root.
    ///
    /// Always performs a fresh scan and waits for it to drain.
    pub async fn total_size(&self) -> Result<u64> {
        let total = self
            .scan()
            .await?
            .fold(0u64, |acc, record| async move { acc + record.size })
            .await;
        debug!(root = %self.root.display(), bytes = total, "Computed cache size");
        Ok(total)
    }
}

async fn ensure_directory(root: &Path) -> Result<()> {
    match fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(EvictionError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        }),
        Err(e) => Err(EvictionError::InvalidRoot {
            path: root.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}

/// Blocking traversal; stops early once the receiver is dropped
fn walk(root: PathBuf, tx: mpsc::Sender<PathBuf>) {
    for entry in WalkDir::new(&root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if tx.blocking_send(entry.into_path()).is_err() {
            trace!(root = %root.display(), "Scan consumer dropped, stopping walk");
            return;
        }
    }
}

/// Stat listed paths through the executor, dropping any that vanished since listing
fn stat_paths<S>(executor: &BoundedExecutor, paths: S) -> impl Stream<Item = FileRecord>
where
    S: Stream<Item = PathBuf>,
{
    executor
        .buffer(paths.map(stat_file))
        .filter_map(futures::future::ready)
}

/// Stat one listed path; `None` if it vanished or is no longer a regular file
async fn stat_file(path: PathBuf) -> Option<FileRecord> {
    let meta = match fs::symlink_metadata(&path).await {
        Ok(meta) => meta,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Stat failed, skipping");
            return None;
        }
    };

    if !meta.is_file() {
        return None;
    }

    // Birth time is not available on every filesystem
    let created = meta.created().or_else(|_| meta.modified()).ok()?;
    FileRecord::new(path, meta.len(), DateTime::<Utc>::from(created))
}
