//! Parsing and validation of `tempo.toml` scheduler configuration files.
//!
//! The file is optional: every field has a default, and [`SchedConfig::default`]
//! is what an empty file produces.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE_NAME};
pub use types::*;
