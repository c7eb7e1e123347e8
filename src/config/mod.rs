//! Configuration module for Kyotei-Archive
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! All sections are optional; an absent file means "use the defaults".
//!
//! # Example
//!
//! ```no_run
//! use kyotei_archive::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("kyotei.toml")).unwrap();
//! println!("Archives are written below {}", config.output.data_dir.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CircuitConfig, Config, FetchConfig, OutputConfig, PublishConfig, SessionConfig, SourceConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
