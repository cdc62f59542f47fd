//! Error types for the cache evictor daemon

use cache_eviction::EvictionError;
use std::fmt;

#[derive(Debug)]
pub enum EvictorError {
    Eviction(EvictionError),
    Config(String),
    Output(String),
}

impl fmt::Display for EvictorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvictorError::Eviction(err) => write!(f, "{}", err),
            EvictorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            EvictorError::Output(msg) => write!(f, "Output error: {}", msg),
        }
    }
}

impl std::error::Error for EvictorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EvictorError::Eviction(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EvictionError> for EvictorError {
    fn from(err: EvictionError) -> Self {
        EvictorError::Eviction(err)
    }
}

impl From<tracing_subscriber::filter::ParseError> for EvictorError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        EvictorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EvictorError {
    fn from(err: serde_json::Error) -> Self {
        EvictorError::Output(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EvictorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_error_passthrough() {
        let err: EvictorError = EvictionError::Config("directoryPath is required".to_string()).into();
        assert_eq!(
            format!("{}", err),
            "Configuration error: directoryPath is required"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = EvictorError::Config("bad directive".to_string());
        assert_eq!(format!("{}", err), "Configuration error: bad directive");
    }

    #[test]
    fn test_error_is_debug() {
        let err = EvictorError::Output("closed pipe".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("Output"));
    }
}
