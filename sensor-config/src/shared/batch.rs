use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Batch assembly configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchConfig {
    /// Maximum number of envelopes in a batch.
    #[serde(default = "default_batch_max_size")]
    pub max_size: usize,
    /// Maximum time, in milliseconds, a non-empty batch waits before it is flushed.
    #[serde(default = "default_batch_max_fill_ms")]
    pub max_fill_ms: u64,
}

impl BatchConfig {
    /// Default maximum batch size.
    pub const DEFAULT_MAX_SIZE: usize = 100;

    /// Default batch timeout in milliseconds.
    pub const DEFAULT_MAX_FILL_MS: u64 = 500;

    /// Validates batch configuration settings.
    ///
    /// Both the size and the timeout must be strictly positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_size == 0 {
            return Err(ValidationError::invalid(
                "batch.max_size",
                "must be greater than 0",
            ));
        }

        if self.max_fill_ms == 0 {
            return Err(ValidationError::invalid(
                "batch.max_fill_ms",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_size: default_batch_max_size(),
            max_fill_ms: default_batch_max_fill_ms(),
        }
    }
}

fn default_batch_max_size() -> usize {
    BatchConfig::DEFAULT_MAX_SIZE
}

fn default_batch_max_fill_ms() -> u64 {
    BatchConfig::DEFAULT_MAX_FILL_MS
}
