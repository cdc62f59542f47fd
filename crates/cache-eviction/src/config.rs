//! Evictor configuration and validation

use crate::error::{EvictionError, Result};
use crate::schedule::CronSchedule;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_CONCURRENCY: usize = 100;

/// Unvalidated settings as delivered by the CLI or environment
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvictorSettings {
    pub directory_path: String,
    /// Capacity of the cache directory in kilobytes
    pub directory_size: Option<u64>,
    /// Fraction of `directory_size` at which capacity eviction starts
    pub fullness_percent: Option<f64>,
    pub cron_string: Option<String>,
    pub concurrency: Option<usize>,
}

/// Byte budget for capacity eviction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityLimit {
    pub directory_size_bytes: u64,
    pub fullness_fraction: f64,
}

impl CapacityLimit {
    pub fn new(directory_size_kb: u64, fullness_fraction: f64) -> Result<Self> {
        if directory_size_kb == 0 {
            return Err(EvictionError::Config(
                "directorySize must be greater than 0".to_string(),
            ));
        }
        // NaN fails both comparisons
        if !(fullness_fraction > 0.0 && fullness_fraction < 1.0) {
            return Err(EvictionError::Config(format!(
                "fullnessPercent must be between 0 and 1 exclusive, got {}",
                fullness_fraction
            )));
        }
        let directory_size_bytes = directory_size_kb.checked_mul(1024).ok_or_else(|| {
            EvictionError::Config(format!("directorySize {} KB is too large", directory_size_kb))
        })?;

        Ok(Self {
            directory_size_bytes,
            fullness_fraction,
        })
    }

    /// Size in bytes at which eviction kicks in
    pub fn limit_bytes(&self) -> u64 {
        (self.directory_size_bytes as f64 * self.fullness_fraction) as u64
    }
}

/// Validated configuration for the evictor
#[derive(Debug, Clone)]
pub struct EvictorConfig {
    pub root: PathBuf,
    pub capacity: Option<CapacityLimit>,
    pub schedule: Option<CronSchedule>,
    pub concurrency: usize,
}

impl EvictorConfig {
    pub fn ttl_enabled(&self) -> bool {
        self.schedule.is_some()
    }
}

impl TryFrom<EvictorSettings> for EvictorConfig {
    type Error = EvictionError;

    fn try_from(settings: EvictorSettings) -> Result<Self> {
        let path = settings.directory_path.trim();
        if path.is_empty() {
            return Err(EvictionError::Config(
                "directoryPath is required".to_string(),
            ));
        }
        let root = PathBuf::from(path);
        if !root.is_absolute() {
            return Err(EvictionError::Config(format!(
                "directoryPath must be absolute, got {}",
                path
            )));
        }

        let capacity = match (settings.directory_size, settings.fullness_percent) {
            (Some(size), Some(fraction)) => Some(CapacityLimit::new(size, fraction)?),
            (None, None) => None,
            (Some(_), None) => {
                return Err(EvictionError::Config(
                    "directorySize requires fullnessPercent".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(EvictionError::Config(
                    "fullnessPercent requires directorySize".to_string(),
                ))
            }
        };

        let schedule = settings
            .cron_string
            .as_deref()
            .filter(|expr| !expr.trim().is_empty())
            .map(CronSchedule::parse)
            .transpose()?;

        if capacity.is_none() && schedule.is_none() {
            return Err(EvictionError::Config(
                "nothing to do: set cronString, or directorySize with fullnessPercent".to_string(),
            ));
        }

        let concurrency = settings.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(EvictionError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            root,
            capacity,
            schedule,
            concurrency,
        })
    }
}
