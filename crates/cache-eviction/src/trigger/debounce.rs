//! Single-slot debounce timer

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};

pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// A timer with one slot: arming it again replaces the pending deadline
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm the timer `window` from now, cancelling any earlier deadline
    pub fn arm(&mut self) {
        self.deadline = Some(Instant::now() + self.window);
    }

    /// Resolve when the armed deadline passes, clearing the slot.
    ///
    /// Never resolves while disarmed. Safe to drop and call again.
    pub async fn fired(&mut self) {
        match self.deadline {
            Some(deadline) => {
                sleep_until(deadline).await;
                self.deadline = None;
            }
            None => std::future::pending().await,
        }
    }
}

/// Collapse bursts from `events` into one `on_fire` call per quiet window.
///
/// `on_fire` runs inline, so two evaluations never overlap; events that
/// arrive meanwhile re-arm the timer for another round. Returns once the
/// sender side closes, dropping any still-pending fire.
pub async fn run_debounced<T, F, Fut>(mut events: mpsc::Receiver<T>, window: Duration, mut on_fire: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut debouncer = Debouncer::new(window);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(_) => debouncer.arm(),
                None => break,
            },
            _ = debouncer.fired() => on_fire().await,
        }
    }
}
