//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::SchedConfig;
use std::path::Path;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "tempo.toml";

/// Loads and validates `tempo.toml` from a directory.
///
/// A missing file is not an error: the defaults are returned.
pub fn load_config(dir: &Path) -> Result<SchedConfig, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(SchedConfig::default());
    }
    let content = std::fs::read_to_string(&config_path)?;
    load_config_from_str(&content)
}

/// Parses and validates a `tempo.toml` configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<SchedConfig, ConfigError> {
    let config: SchedConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &SchedConfig) -> Result<(), ConfigError> {
    if config.sim.max_cycles == 0 {
        return Err(ConfigError::InvalidValue {
            field: "sim.max_cycles",
            reason: "must be greater than zero".to_string(),
        });
    }
    if config.sim.reset_cycles == 0 {
        return Err(ConfigError::InvalidValue {
            field: "sim.reset_cycles",
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(())
}
