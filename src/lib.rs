//! HTTPS-Parity: paired HTTP/HTTPS crawl and divergence classifier
//!
//! This crate fetches every domain of a ranked list twice, once over plain
//! HTTP and once over HTTPS, persists both transcripts as one record, and later
//! classifies each record to surface domains whose secure variant is broken or
//! lands somewhere other than the insecure one.

pub mod classify;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for HTTPS-Parity operations
#[derive(Debug, Error)]
pub enum ParityError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Domain source error: {0}")]
    Source(#[from] SourceError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while opening or tearing down a fetch session
///
/// Failures of an individual leg are never reported through this type; they
/// are recorded in the leg's transcript instead.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to start fetch session: {0}")]
    Session(String),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Errors raised while reading the ranked domain list
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read domain list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed domain list line {line}: {content:?}")]
    Malformed { line: usize, content: String },
}

/// Errors for records that cannot be classified
///
/// The report logs these and moves on; they never abort a scan.
#[derive(Debug, Error)]
pub enum ClassificationError {
    #[error("Malformed record for {domain}: {reason}")]
    Malformed { domain: String, reason: String },

    #[error("Unreadable record: {0}")]
    Unreadable(String),
}

/// Result type alias for HTTPS-Parity operations
pub type Result<T> = std::result::Result<T, ParityError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use classify::{classify, Classification, Verdict};
pub use config::Config;
pub use record::{FailureKind, FetchFailure, ResponseRecord, ResultRecord, Transcript};
pub use url::essence;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_wrap_into_parity_error() {
        let err: ParityError = ConfigError::Validation("concurrency must be > 0".to_string()).into();
        assert!(matches!(err, ParityError::Config(_)));
        assert!(err.to_string().contains("concurrency must be > 0"));

        let err: ParityError = storage::StorageError::NotFound("a.com".to_string()).into();
        assert!(matches!(err, ParityError::Storage(_)));

        let err: ParityError = SourceError::Malformed {
            line: 3,
            content: "x".to_string(),
        }
        .into();
        assert!(err.to_string().contains("line 3"));

        let err: ParityError = FetchError::Session("no browser".to_string()).into();
        assert!(matches!(err, ParityError::Fetch(_)));
    }
}
