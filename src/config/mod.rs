//! Configuration module for link-ledger
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, with environment variables overriding the connection settings.
//!
//! # Example
//!
//! ```no_run
//! use link_ledger::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ledger.toml")).unwrap();
//! println!("Crawling {} with {} workers", config.crawler.start_url, config.crawler.workers);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AuthConfig, Config, CrawlerConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;
