//! Eviction engine: scans the cache root and applies the policies

use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::policy::{capacity, ttl};
use crate::scanner::DirectoryScanner;
use crate::types::{CacheSnapshot, DeletionOutcome};
use chrono::Utc;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Owns the cache root and the executor used for all filesystem work.
///
/// Holds no scan state between calls; every pass takes a fresh snapshot.
#[derive(Debug, Clone)]
pub struct EvictionEngine {
    scanner: DirectoryScanner,
    executor: BoundedExecutor,
}

impl EvictionEngine {
    pub fn new(root: PathBuf, executor: BoundedExecutor) -> Self {
        Self {
            scanner: DirectoryScanner::new(root, executor.clone()),
            executor,
        }
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    pub fn executor(&self) -> &BoundedExecutor {
        &self.executor
    }

    /// Scan the root into a new snapshot
    pub async fn snapshot(&self) -> Result<CacheSnapshot> {
        let snapshot = CacheSnapshot::new(self.scanner.scan().await?.collect().await);
        debug!(
            files = snapshot.len(),
            bytes = snapshot.total_size(),
            "Scanned cache root"
        );
        Ok(snapshot)
    }

    /// Current aggregate size of the root, from a fresh scan
    pub async fn total_size(&self) -> Result<u64> {
        self.scanner.total_size().await
    }

    /// Delete every cache entry whose embedded expiry has passed.
    ///
    /// Returns the number of directories scheduled for deletion. Fails only
    /// when the root cannot be scanned.
    pub async fn evict_expired(&self) -> Result<usize> {
        self.evict_expired_at(Utc::now().timestamp_millis()).await
    }

    pub async fn evict_expired_at(&self, now_ms: i64) -> Result<usize> {
        let snapshot = self.snapshot().await?;
        let dirs = ttl::expired_dirs(self.root(), snapshot.files(), now_ms);
        let scheduled = dirs.len();

        let outcome = self.remove_dirs(dirs).await;
        if outcome.failed > 0 {
            warn!(
                scheduled,
                removed = outcome.removed,
                failed = outcome.failed,
                "Some expired directories could not be removed"
            );
        }

        Ok(scheduled)
    }

    /// Delete oldest entries from `snapshot` until it fits under `limit`.
    ///
    /// Returns the bytes scheduled for release; 0 when already within budget.
    pub async fn evict_to_capacity(&self, snapshot: &CacheSnapshot, limit: u64) -> u64 {
        let excess = capacity::excess(snapshot.total_size(), limit);
        if excess == 0 {
            debug!(
                bytes = snapshot.total_size(),
                limit, "Cache within capacity"
            );
            return 0;
        }

        let selection = capacity::select_victims(self.root(), snapshot.files(), excess);
        info!(
            excess,
            files = selection.files,
            directories = selection.dirs.len(),
            "Evicting oldest cache entries"
        );

        let outcome = self.remove_dirs(selection.dirs).await;
        if outcome.failed > 0 {
            warn!(
                removed = outcome.removed,
                failed = outcome.failed,
                "Some cache entries could not be removed"
            );
        }

        selection.freed
    }

    /// Remove directories concurrently; failures are logged and counted
    pub async fn remove_dirs(&self, dirs: Vec<PathBuf>) -> DeletionOutcome {
        let results = self.executor.join_all(dirs.into_iter().map(remove_entry_dir)).await;

        results
            .into_iter()
            .fold(DeletionOutcome::default(), |mut outcome, ok| {
                if ok {
                    outcome.removed += 1;
                } else {
                    outcome.failed += 1;
                }
                outcome
            })
    }
}

/// Recursively remove one cache entry directory; a missing target counts as removed
async fn remove_entry_dir(dir: PathBuf) -> bool {
    match fs::remove_dir_all(&dir).await {
        Ok(()) => {
            debug!(path = %dir.display(), "Removed cache entry");
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => true,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Failed to remove cache entry");
            false
        }
    }
}
