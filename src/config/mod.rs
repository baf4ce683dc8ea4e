//! Configuration module for Crag-Leader
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use crag_leader::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crag.toml")).unwrap();
//! println!("Scraping crag: {}", config.source.crag_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, Credentials, OutputConfig, SourceConfig, UserAgentConfig,
    PASSWORD_ENV, USERNAME_ENV,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
