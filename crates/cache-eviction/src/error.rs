//! Error types for the cache eviction engine

use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum EvictionError {
    /// Rejected configuration, fatal at construction
    Config(String),
    /// The cache root is missing or is not a directory
    InvalidRoot { path: PathBuf, reason: String },
    /// Invalid cron expression
    Schedule(String),
    /// The file-system watcher could not be started
    Watch(String),
    /// A spawned task panicked or was cancelled
    Task(String),
}

impl fmt::Display for EvictionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictionError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EvictionError::InvalidRoot { path, reason } => {
                write!(f, "Invalid cache root {}: {}", path.display(), reason)
            }
            EvictionError::Schedule(msg) => write!(f, "Schedule error: {}", msg),
            EvictionError::Watch(msg) => write!(f, "Watch error: {}", msg),
            EvictionError::Task(msg) => write!(f, "Task error: {}", msg),
        }
    }
}

impl std::error::Error for EvictionError {}

impl From<notify::Error> for EvictionError {
    fn from(err: notify::Error) -> Self {
        EvictionError::Watch(err.to_string())
    }
}

impl From<tokio::task::JoinError> for EvictionError {
    fn from(err: tokio::task::JoinError) -> Self {
        EvictionError::Task(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EvictionError>;
