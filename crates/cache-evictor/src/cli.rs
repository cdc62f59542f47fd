//! Command-line and environment configuration

use cache_eviction::EvictorSettings;
use clap::Parser;

/// Keep an image optimizer cache directory within its TTL and size budget
#[derive(Debug, Parser)]
#[command(name = "cache-evictor", version)]
pub struct Args {
    /// Absolute path of the cache directory
    #[arg(long, env = "DIRECTORY_PATH")]
    pub directory_path: String,

    /// Capacity of the cache directory in kilobytes
    #[arg(long, env = "DIRECTORY_SIZE", requires = "fullness_percent")]
    pub directory_size: Option<u64>,

    /// Fraction of the capacity (between 0 and 1) at which eviction starts
    #[arg(long, env = "FULLNESS_PERCENT", requires = "directory_size")]
    pub fullness_percent: Option<f64>,

    /// Cron expression for the TTL pass, e.g. "0 * * * *"
    #[arg(long, env = "CRON_STRING")]
    pub cron_string: Option<String>,

    /// Maximum concurrent stat/delete operations
    #[arg(long, env = "CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Run each enabled policy once, print a JSON report and exit
    #[arg(long)]
    pub once: bool,
}

impl From<&Args> for EvictorSettings {
    fn from(args: &Args) -> Self {
        Self {
            directory_path: args.directory_path.clone(),
            directory_size: args.directory_size,
            fullness_percent: args.fullness_percent,
            cron_string: args.cron_string.clone(),
            concurrency: args.concurrency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache_eviction::EvictorConfig;

    #[test]
    fn test_args_definition_is_valid() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_full_args() {
        let args = Args::try_parse_from([
            "cache-evictor",
            "--directory-path",
            "/srv/cache/images",
            "--directory-size",
            "2048",
            "--fullness-percent",
            "0.75",
            "--cron-string",
            "*/10 * * * *",
            "--once",
        ])
        .unwrap();

        assert!(args.once);
        let config = EvictorConfig::try_from(EvictorSettings::from(&args)).unwrap();
        assert_eq!(config.capacity.unwrap().limit_bytes(), 1_572_864);
        assert!(config.ttl_enabled());
    }

    #[test]
    fn test_size_requires_percent() {
        let result = Args::try_parse_from([
            "cache-evictor",
            "--directory-path",
            "/srv/cache/images",
            "--directory-size",
            "2048",
        ]);
        assert!(result.is_err());
    }
}
