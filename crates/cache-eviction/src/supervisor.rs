//! Wires a validated configuration to the triggers

use crate::config::EvictorConfig;
use crate::engine::EvictionEngine;
use crate::error::Result;
use crate::executor::BoundedExecutor;
use crate::trigger::{PeriodicTrigger, WatchTrigger};
use crate::types::EvictionReport;
use tokio::task::JoinSet;
use tracing::info;

/// Owns the engine and runs whichever triggers the configuration enables.
///
/// The periodic and watch triggers share the engine but are not sequenced
/// against each other; a TTL pass and a capacity pass may overlap.
pub struct Supervisor {
    config: EvictorConfig,
    engine: EvictionEngine,
}

impl Supervisor {
    pub fn new(config: EvictorConfig) -> Self {
        let executor = BoundedExecutor::new(config.concurrency);
        let engine = EvictionEngine::new(config.root.clone(), executor);
        Self { config, engine }
    }

    pub fn engine(&self) -> &EvictionEngine {
        &self.engine
    }

    /// Run all enabled triggers until they stop.
    ///
    /// Neither trigger gives up on a missing root; only a panicked trigger
    /// ends the run early.
    pub async fn run(self) -> Result<()> {
        let mut tasks = JoinSet::new();

        if let Some(schedule) = self.config.schedule.clone() {
            let trigger = PeriodicTrigger::new(schedule, self.engine.clone());
            tasks.spawn(trigger.run());
        }

        if let Some(capacity) = self.config.capacity {
            let trigger = WatchTrigger::new(self.engine.clone(), capacity);
            tasks.spawn(trigger.run());
        }

        info!(
            root = %self.config.root.display(),
            ttl = self.config.ttl_enabled(),
            capacity = self.config.capacity.is_some(),
            concurrency = self.config.concurrency,
            "Cache evictor running"
        );

        while let Some(joined) = tasks.join_next().await {
            joined?;
        }

        Ok(())
    }

    /// One TTL pass (if enabled) followed by one capacity check (if enabled)
    pub async fn run_once(&self) -> Result<EvictionReport> {
        let mut report = EvictionReport::default();

        if self.config.ttl_enabled() {
            let deleted = self.engine.evict_expired().await?;
            info!(deleted, "{} directories deleted", deleted);
            report.expired_directories = Some(deleted);
        }

        if let Some(capacity) = self.config.capacity {
            let snapshot = self.engine.snapshot().await?;
            let limit = capacity.limit_bytes();
            report.size_before = Some(snapshot.total_size());

            let released = if snapshot.total_size() >= limit {
                self.engine.evict_to_capacity(&snapshot, limit).await
            } else {
                0
            };
            info!(bytes = released, "{} bytes released", released);
            report.bytes_released = Some(released);
        }

        Ok(report)
    }
}
