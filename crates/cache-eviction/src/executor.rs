//! Bounded-concurrency execution of filesystem operations

use futures::stream::{self, Stream, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Runs batches of futures with at most `concurrency` in flight.
///
/// The limit is shared between clones and read when a batch starts, so a
/// change applies to the next batch without rebuilding anything.
#[derive(Debug, Clone)]
pub struct BoundedExecutor {
    limit: Arc<AtomicUsize>,
}

impl BoundedExecutor {
    pub fn new(concurrency: usize) -> Self {
        Self {
            limit: Arc::new(AtomicUsize::new(concurrency.max(1))),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.limit.load(Ordering::Relaxed)
    }

    pub fn set_concurrency(&self, concurrency: usize) {
        self.limit.store(concurrency.max(1), Ordering::Relaxed);
    }

    /// Drive a stream of futures, yielding outputs as they complete
    pub fn buffer<S>(&self, tasks: S) -> impl Stream<Item = <S::Item as Future>::Output>
    where
        S: Stream,
        S::Item: Future,
    {
        tasks.buffer_unordered(self.concurrency())
    }

    /// Run every task and wait for all of them.
    ///
    /// A failing task does not cancel its siblings; outputs come back in
    /// completion order.
    pub async fn join_all<I, F>(&self, tasks: I) -> Vec<F::Output>
    where
        I: IntoIterator<Item = F>,
        F: Future,
    {
        self.buffer(stream::iter(tasks)).collect().await
    }
}

/// Adapt a channel receiver into a stream that ends when every sender is dropped
pub(crate) fn receiver_stream<T>(rx: mpsc::Receiver<T>) -> impl Stream<Item = T> {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONCURRENCY)
    }
}
