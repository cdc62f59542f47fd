//! Eviction engine for on-disk image optimizer caches
//!
//! Keeps a cache directory bounded with two independent policies: entries
//! whose file names carry a past expiry are removed on a cron schedule, and
//! the oldest entries are removed when new files push the directory over its
//! size budget. A cache entry is the directory holding its files.

pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod policy;
pub mod scanner;
pub mod schedule;
pub mod supervisor;
pub mod trigger;
pub mod types;

pub use config::{CapacityLimit, EvictorConfig, EvictorSettings, DEFAULT_CONCURRENCY};
pub use engine::EvictionEngine;
pub use error::{EvictionError, Result};
pub use executor::BoundedExecutor;
pub use scanner::DirectoryScanner;
pub use schedule::CronSchedule;
pub use supervisor::Supervisor;
pub use trigger::{PeriodicTrigger, WatchTrigger};
pub use types::{CacheSnapshot, DeletionOutcome, EvictionReport, FileRecord};
