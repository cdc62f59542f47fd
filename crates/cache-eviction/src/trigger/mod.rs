//! Triggers that decide when the engine runs

pub mod debounce;
pub mod periodic;
pub mod watch;

pub use debounce::{run_debounced, Debouncer, DEFAULT_DEBOUNCE_WINDOW};
pub use periodic::PeriodicTrigger;
pub use watch::{within_depth, WatchTrigger, WriteSettle, DEFAULT_WATCH_DEPTH};
