use sensor_config::load_config;
use sensor_config::shared::EmitterConfig;

use crate::error::{EmitterError, EmitterResult};

/// Loads and validates the service configuration.
pub fn load_emitter_config() -> EmitterResult<EmitterConfig> {
    let config = load_config::<EmitterConfig>().map_err(EmitterError::config)?;
    config.validate().map_err(EmitterError::config)?;

    Ok(config)
}
