//! Cache Evictor - keeps an image optimizer cache directory bounded
//!
//! Removes expired cache entries on a cron schedule and trims the oldest
//! entries whenever new files push the directory over its size budget.

mod cli;
mod error;

use crate::cli::Args;
use crate::error::Result;
use cache_eviction::{EvictorConfig, EvictorSettings, Supervisor};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("cache_evictor=info".parse()?)
        .add_directive("cache_eviction=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    };

    let args = Args::parse();
    let config = EvictorConfig::try_from(EvictorSettings::from(&args))?;

    info!("Starting cache evictor...");
    info!("Cache dir: {:?}", config.root);
    if let Some(capacity) = config.capacity {
        info!(
            "Capacity: {} KB, evicting above {} bytes",
            capacity.directory_size_bytes / 1024,
            capacity.limit_bytes()
        );
    }
    if let Some(schedule) = &config.schedule {
        info!("TTL schedule: {}", schedule.expression());
    }

    let supervisor = Supervisor::new(config);

    if args.once {
        let report = supervisor.run_once().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    tokio::select! {
        result = supervisor.run() => result?,
        _ = tokio::signal::ctrl_c() => warn!("Received Ctrl-C, shutting down"),
    }

    Ok(())
}
