//! Configuration module for HTTPS-Parity
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use https_parity::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("parity.toml")).unwrap();
//! println!("Crawling with concurrency {}", config.crawler.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ConfigOverrides, CrawlerConfig, FetchConfig, ReportConfig, StoreConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, load_config_with_overrides, parse_config,
};
pub use validation::validate;
