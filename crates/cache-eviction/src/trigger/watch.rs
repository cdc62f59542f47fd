//! Change-driven capacity eviction
//!
//! New files under the cache root arm a debounce timer; once a burst settles
//! the root is re-scanned and, if at or over the limit, trimmed oldest first.

use crate::config::CapacityLimit;
use crate::engine::EvictionEngine;
use crate::error::Result;
use crate::executor::{receiver_stream, BoundedExecutor};
use crate::trigger::debounce::{run_debounced, DEFAULT_DEBOUNCE_WINDOW};
use futures::stream::{Stream, StreamExt};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

/// Directory levels below the root whose new files are observed
pub const DEFAULT_WATCH_DEPTH: usize = 2;

const DEFAULT_INSTALL_RETRY: Duration = Duration::from_secs(5);

const RAW_EVENT_CAPACITY: usize = 4096;
const SETTLED_EVENT_CAPACITY: usize = 256;

/// How long a new file's size must stay unchanged before it counts as written
#[derive(Debug, Clone, Copy)]
pub struct WriteSettle {
    pub stability: Duration,
    pub poll_interval: Duration,
}

impl Default for WriteSettle {
    fn default() -> Self {
        Self {
            stability: Duration::from_millis(2000),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl WriteSettle {
    /// Wait until `path` stops growing. `false` if it vanished or is not a regular file.
    pub async fn wait(&self, path: &Path) -> bool {
        let mut last_size = None;
        let mut stable_since = Instant::now();

        loop {
            let size = match fs::symlink_metadata(path).await {
                Ok(meta) if meta.is_file() => meta.len(),
                Ok(_) => return false,
                Err(e) => {
                    trace!(path = %path.display(), error = %e, "New file disappeared before settling");
                    return false;
                }
            };

            if last_size != Some(size) {
                last_size = Some(size);
                stable_since = Instant::now();
            } else if stable_since.elapsed() >= self.stability {
                return true;
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// Whether `path` lies within `depth` directory levels below `root`
pub fn within_depth(root: &Path, path: &Path, depth: usize) -> bool {
    match path.strip_prefix(root) {
        Ok(rel) => {
            let components = rel.components().count();
            components > 0 && components <= depth + 1
        }
        Err(_) => false,
    }
}

/// Only new files that settle are forwarded to the debouncer. Settle waits
/// run through `executor`, so at most its limit are polling at once.
fn settled_paths<S, F, Fut>(
    executor: &BoundedExecutor,
    paths: S,
    mut wait: F,
) -> impl Stream<Item = PathBuf>
where
    S: Stream<Item = PathBuf>,
    F: FnMut(PathBuf) -> Fut,
    Fut: Future<Output = bool>,
{
    executor
        .buffer(paths.map(move |path| {
            let settled = wait(path.clone());
            async move { settled.await.then_some(path) }
        }))
        .filter_map(futures::future::ready)
}

/// Watches the cache root and runs capacity eviction after bursts of new files
pub struct WatchTrigger {
    engine: EvictionEngine,
    capacity: CapacityLimit,
    debounce: Duration,
    settle: WriteSettle,
    install_retry: Duration,
}

impl WatchTrigger {
    pub fn new(engine: EvictionEngine, capacity: CapacityLimit) -> Self {
        Self {
            engine,
            capacity,
            debounce: DEFAULT_DEBOUNCE_WINDOW,
            settle: WriteSettle::default(),
            install_retry: DEFAULT_INSTALL_RETRY,
        }
    }

    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn with_write_settle(mut self, settle: WriteSettle) -> Self {
        self.settle = settle;
        self
    }

    /// How long to wait before retrying a watcher that could not be installed
    pub fn with_install_retry(mut self, interval: Duration) -> Self {
        self.install_retry = interval;
        self
    }

    /// Watch for as long as the returned future is polled.
    ///
    /// A root that does not exist yet is not fatal: installation is retried
    /// until it succeeds.
    pub async fn run(self) {
        let (raw_tx, raw_rx) = mpsc::channel::<PathBuf>(RAW_EVENT_CAPACITY);
        let watcher = self.install(raw_tx).await;

        info!(
            root = %self.engine.root().display(),
            limit = self.capacity.limit_bytes(),
            depth = DEFAULT_WATCH_DEPTH,
            "Watching cache root for new files"
        );

        let (settled_tx, settled_rx) = mpsc::channel::<()>(SETTLED_EVENT_CAPACITY);
        let settle = self.settle;
        let executor = self.engine.executor().clone();
        let forwarder = tokio::spawn(async move {
            let settled = settled_paths(&executor, receiver_stream(raw_rx), move |path| async move {
                settle.wait(&path).await
            });
            let mut settled = std::pin::pin!(settled);

            while let Some(path) = settled.next().await {
                trace!(path = %path.display(), "New cache file settled");
                if settled_tx.send(()).await.is_err() {
                    break;
                }
            }
        });

        run_debounced(settled_rx, self.debounce, || self.evaluate()).await;

        forwarder.abort();
        drop(watcher);
    }

    async fn install(&self, raw_tx: mpsc::Sender<PathBuf>) -> RecommendedWatcher {
        loop {
            match self.try_install(raw_tx.clone()).await {
                Ok(watcher) => return watcher,
                Err(e) => {
                    error!(
                        root = %self.engine.root().display(),
                        error = %e,
                        retry_ms = self.install_retry.as_millis() as u64,
                        "Could not watch cache root, retrying"
                    );
                    tokio::time::sleep(self.install_retry).await;
                }
            }
        }
    }

    async fn try_install(&self, raw_tx: mpsc::Sender<PathBuf>) -> Result<RecommendedWatcher> {
        let root = self.engine.root().to_path_buf();

        // Some backends report canonical paths
        let canonical_root = fs::canonicalize(&root).await.unwrap_or_else(|_| root.clone());
        let watch_root = root.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Create(_)) {
                    return;
                }
                for path in event.paths {
                    if within_depth(&watch_root, &path, DEFAULT_WATCH_DEPTH)
                        || within_depth(&canonical_root, &path, DEFAULT_WATCH_DEPTH)
                    {
                        // A full channel already guarantees a pending evaluation
                        let _ = raw_tx.try_send(path);
                    }
                }
            }
            Err(e) => warn!(error = %e, "File watcher error"),
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;
        Ok(watcher)
    }

    async fn evaluate(&self) {
        if let Err(e) = self.check_capacity().await {
            error!(error = %e, "Capacity check failed");
        }
    }

    /// Re-scan the root and evict if at or over the limit. Returns bytes released.
    pub async fn check_capacity(&self) -> Result<u64> {
        let snapshot = self.engine.snapshot().await?;
        let limit = self.capacity.limit_bytes();
        debug!(bytes = snapshot.total_size(), limit, "Evaluating cache capacity");

        if snapshot.total_size() < limit {
            return Ok(0);
        }

        let released = self.engine.evict_to_capacity(&snapshot, limit).await;
        info!(bytes = released, "{} bytes released", released);
        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, len: usize) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, vec![b'x'; len]).unwrap();
    }

    async fn wait_until_trimmed(root: &Path, limit: u64) {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let remaining = EvictionEngine::new(root.to_path_buf(), BoundedExecutor::default())
                .total_size()
                .await
                .unwrap_or(u64::MAX);
            if remaining <= limit {
                return;
            }
            assert!(Instant::now() < deadline, "cache never trimmed: {} bytes", remaining);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    fn fast_settle() -> WriteSettle {
        WriteSettle {
            stability: Duration::from_millis(30),
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_within_depth() {
        let root = Path::new("/cache");
        assert!(within_depth(root, Path::new("/cache/a.jpg"), 2));
        assert!(within_depth(root, Path::new("/cache/x/a.jpg"), 2));
        assert!(within_depth(root, Path::new("/cache/x/y/a.jpg"), 2));
        assert!(!within_depth(root, Path::new("/cache/x/y/z/a.jpg"), 2));
        assert!(!within_depth(root, Path::new("/cache"), 2));
        assert!(!within_depth(root, Path::new("/elsewhere/a.jpg"), 2));
    }

    #[tokio::test]
    async fn test_settle_on_complete_file() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/a.1.jpg", 10);
        assert!(fast_settle().wait(&dir.path().join("a/a.1.jpg")).await);
    }

    #[tokio::test]
    async fn test_settle_on_missing_file() {
        let dir = tempdir().unwrap();
        assert!(!fast_settle().wait(&dir.path().join("nope.1.jpg")).await);
    }

    #[tokio::test]
    async fn test_settle_ignores_directories() {
        let dir = tempdir().unwrap();
        assert!(!fast_settle().wait(dir.path()).await);
    }

    #[tokio::test]
    async fn test_check_capacity_under_limit() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/a.1.jpg", 100);

        let engine = EvictionEngine::new(dir.path().to_path_buf(), BoundedExecutor::default());
        // 1 KB at 0.5 => 512 byte limit
        let trigger = WatchTrigger::new(engine, CapacityLimit::new(1, 0.5).unwrap());

        assert_eq!(trigger.check_capacity().await.unwrap(), 0);
        assert!(dir.path().join("a/a.1.jpg").exists());
    }

    #[tokio::test]
    async fn test_check_capacity_over_limit() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a/a.1.jpg", 400);
        std::thread::sleep(Duration::from_millis(20));
        write(dir.path(), "b/b.1.jpg", 400);

        let engine = EvictionEngine::new(dir.path().to_path_buf(), BoundedExecutor::default());
        let trigger = WatchTrigger::new(engine, CapacityLimit::new(1, 0.5).unwrap());

        assert_eq!(trigger.check_capacity().await.unwrap(), 400);
        assert!(!dir.path().join("a").exists());
        assert!(dir.path().join("b/b.1.jpg").exists());
    }

    #[tokio::test]
    async fn test_new_files_trigger_eviction() {
        let dir = tempdir().unwrap();
        let root = dir.path().to_path_buf();

        for i in 0..4 {
            std::fs::create_dir_all(root.join(format!("e{i}"))).unwrap();
        }

        let engine = EvictionEngine::new(root.clone(), BoundedExecutor::default());
        let trigger = WatchTrigger::new(engine, CapacityLimit::new(1, 0.5).unwrap())
            .with_debounce(Duration::from_millis(50))
            .with_write_settle(fast_settle());
        let handle = tokio::spawn(trigger.run());

        // Give the watcher time to install
        tokio::time::sleep(Duration::from_millis(200)).await;
        for i in 0..4 {
            write(&root, &format!("e{i}/e{i}.1.jpg"), 300);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        wait_until_trimmed(&root, 512).await;
        handle.abort();
    }

    #[tokio::test]
    async fn test_watch_installs_once_root_appears() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("cache");

        let engine = EvictionEngine::new(root.clone(), BoundedExecutor::default());
        let trigger = WatchTrigger::new(engine, CapacityLimit::new(1, 0.5).unwrap())
            .with_debounce(Duration::from_millis(50))
            .with_write_settle(fast_settle())
            .with_install_retry(Duration::from_millis(50));
        let handle = tokio::spawn(trigger.run());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!handle.is_finished());

        for i in 0..4 {
            std::fs::create_dir_all(root.join(format!("e{i}"))).unwrap();
        }
        // Let a retry pick up the new root
        tokio::time::sleep(Duration::from_millis(300)).await;
        for i in 0..4 {
            write(&root, &format!("e{i}/e{i}.1.jpg"), 300);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        wait_until_trimmed(&root, 512).await;
        handle.abort();
    }

    #[tokio::test]
    async fn test_settle_waits_respect_executor_limit() {
        let executor = BoundedExecutor::new(3);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let paths = futures::stream::iter(
            (0..20).map(|i| PathBuf::from(format!("/cache/e{i}/e{i}.1.jpg"))),
        );
        let settled: Vec<PathBuf> = settled_paths(&executor, paths, |path| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                !path.ends_with("e0/e0.1.jpg")
            }
        })
        .collect()
        .await;

        assert_eq!(settled.len(), 19);
        assert!(!settled.contains(&PathBuf::from("/cache/e0/e0.1.jpg")));
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }
}
