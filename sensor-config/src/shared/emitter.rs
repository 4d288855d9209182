use serde::Deserialize;

use crate::shared::{EngineConfig, GeneratorConfig, SinkConfig, ValidationError};

/// Prometheus exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricsConfig {
    /// Port the exporter listens on.
    pub port: u16,
}

/// Top-level configuration of the sensor engine service.
///
/// Contains everything needed to run one engine: stage tuning, the value source, the
/// sink and optional run bounds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmitterConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    /// Stops the engine after this many milliseconds when set.
    pub run_for_ms: Option<u64>,
    /// Enables the Prometheus exporter when set.
    pub metrics: Option<MetricsConfig>,
}

impl EmitterConfig {
    /// Validates the whole service configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.engine.validate()?;
        self.generator.validate()?;
        self.sink.validate()?;

        if self.run_for_ms == Some(0) {
            return Err(ValidationError::invalid(
                "run_for_ms",
                "must be greater than 0 when set",
            ));
        }

        Ok(())
    }
}
