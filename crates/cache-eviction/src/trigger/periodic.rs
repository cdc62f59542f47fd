//! Cron-driven TTL eviction

use crate::engine::EvictionEngine;
use crate::error::Result;
use crate::schedule::CronSchedule;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, error, info, warn, Level};

/// Runs a TTL pass on every tick of a cron schedule
pub struct PeriodicTrigger {
    schedule: CronSchedule,
    engine: EvictionEngine,
}

impl PeriodicTrigger {
    pub fn new(schedule: CronSchedule, engine: EvictionEngine) -> Self {
        Self { schedule, engine }
    }

    /// Parse `expression` up front so a bad schedule fails before the first tick
    pub fn from_expression(expression: &str, engine: EvictionEngine) -> Result<Self> {
        Ok(Self::new(CronSchedule::parse(expression)?, engine))
    }

    /// Tick forever. Returns only if the schedule has no further fire times.
    pub async fn run(self) {
        info!(schedule = %self.schedule.expression(), "Periodic TTL eviction started");

        loop {
            let now = Utc::now();
            let Some(next) = self.schedule.next_after(now) else {
                warn!(schedule = %self.schedule.expression(), "Schedule has no upcoming fire time");
                return;
            };

            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(next = %next, "Waiting for next TTL pass");
            tokio::time::sleep(wait).await;

            if let Err(e) = self.tick().await {
                error!(error = %e, "TTL pass failed");
            }
        }
    }

    /// One scheduled pass: optional size trace, then TTL eviction
    pub async fn tick(&self) -> Result<usize> {
        // The size scan is only worth its I/O when someone will see it
        if tracing::enabled!(Level::DEBUG) {
            match self.engine.total_size().await {
                Ok(bytes) => debug!(bytes, "Cache size before TTL pass"),
                Err(e) => debug!(error = %e, "Could not compute cache size"),
            }
        }

        let deleted = self.engine.evict_expired().await?;
        info!(deleted, "{} directories deleted", deleted);
        Ok(deleted)
    }
}
