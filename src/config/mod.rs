//! Configuration module for the harvester
//!
//! This module handles loading, parsing, and validating the TOML workload
//! file that lists the crawl units to run.
//!
//! # Example
//!
//! ```no_run
//! use asset_harvester::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! for unit in &config.units {
//!     println!("{} -> max depth {}", unit.name, unit.max_depth);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DispatcherConfig, HttpConfig, OutputConfig, UnitConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate_unit;
