use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shared::{BatchConfig, ValidationError};

/// Capacities of the two bounded queues wiring the engine stages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueConfig {
    /// Capacity of the queue between the generator and the batcher, in envelopes.
    #[serde(default = "default_envelope_capacity")]
    pub envelope_capacity: usize,
    /// Capacity of the queue between the batcher and the publishers, in batches.
    #[serde(default = "default_batch_capacity")]
    pub batch_capacity: usize,
}

impl QueueConfig {
    /// Default envelope queue capacity.
    pub const DEFAULT_ENVELOPE_CAPACITY: usize = 100;

    /// Default batch queue capacity.
    pub const DEFAULT_BATCH_CAPACITY: usize = 10;

    /// Validates that both queues can hold at least one element.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.envelope_capacity == 0 {
            return Err(ValidationError::invalid(
                "queue.envelope_capacity",
                "must be greater than 0",
            ));
        }

        if self.batch_capacity == 0 {
            return Err(ValidationError::invalid(
                "queue.batch_capacity",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            envelope_capacity: default_envelope_capacity(),
            batch_capacity: default_batch_capacity(),
        }
    }
}

fn default_envelope_capacity() -> usize {
    QueueConfig::DEFAULT_ENVELOPE_CAPACITY
}

fn default_batch_capacity() -> usize {
    QueueConfig::DEFAULT_BATCH_CAPACITY
}

/// Configuration of one engine run.
///
/// Created before the engine starts and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Interval, in milliseconds, between two generated envelopes.
    #[serde(default = "default_production_interval_ms")]
    pub production_interval_ms: u64,
    /// Batch assembly configuration.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Number of concurrent publisher workers.
    ///
    /// Batches may reach the sink out of generation order when this is greater than one.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Bounded queue capacities.
    #[serde(default)]
    pub queue: QueueConfig,
}

impl EngineConfig {
    /// Default production interval in milliseconds.
    pub const DEFAULT_PRODUCTION_INTERVAL_MS: u64 = 100;

    /// Default number of publisher workers.
    pub const DEFAULT_MAX_WORKERS: usize = 3;

    /// Configuration tuned for throughput: fast production, large batches, many workers.
    pub fn high_throughput() -> Self {
        Self {
            production_interval_ms: 10,
            batch: BatchConfig {
                max_size: 1000,
                max_fill_ms: 100,
            },
            max_workers: 10,
            queue: QueueConfig::default(),
        }
    }

    /// Configuration tuned for latency: small batches flushed quickly.
    pub fn low_latency() -> Self {
        Self {
            production_interval_ms: 50,
            batch: BatchConfig {
                max_size: 10,
                max_fill_ms: 25,
            },
            max_workers: 5,
            queue: QueueConfig::default(),
        }
    }

    /// Returns the production interval as a [`Duration`].
    pub fn production_interval(&self) -> Duration {
        Duration::from_millis(self.production_interval_ms)
    }

    /// Returns the batch timeout as a [`Duration`].
    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch.max_fill_ms)
    }

    /// Validates engine configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.production_interval_ms == 0 {
            return Err(ValidationError::invalid(
                "production_interval_ms",
                "must be greater than 0",
            ));
        }

        if self.max_workers == 0 {
            return Err(ValidationError::invalid(
                "max_workers",
                "must be greater than 0",
            ));
        }

        self.batch.validate()?;
        self.queue.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            production_interval_ms: default_production_interval_ms(),
            batch: BatchConfig::default(),
            max_workers: default_max_workers(),
            queue: QueueConfig::default(),
        }
    }
}

fn default_production_interval_ms() -> u64 {
    EngineConfig::DEFAULT_PRODUCTION_INTERVAL_MS
}

fn default_max_workers() -> usize {
    EngineConfig::DEFAULT_MAX_WORKERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid() {
        for config in [
            EngineConfig::default(),
            EngineConfig::high_throughput(),
            EngineConfig::low_latency(),
        ] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn default_matches_documented_values() {
        let config = EngineConfig::default();

        assert_eq!(config.production_interval(), Duration::from_millis(100));
        assert_eq!(config.batch.max_size, 100);
        assert_eq!(config.batch_timeout(), Duration::from_millis(500));
        assert_eq!(config.max_workers, 3);
    }

    #[test]
    fn zero_values_are_rejected() {
        let cases: Vec<(EngineConfig, &str)> = vec![
            (
                EngineConfig {
                    production_interval_ms: 0,
                    ..EngineConfig::default()
                },
                "production_interval_ms",
            ),
            (
                EngineConfig {
                    max_workers: 0,
                    ..EngineConfig::default()
                },
                "max_workers",
            ),
            (
                EngineConfig {
                    batch: BatchConfig {
                        max_size: 0,
                        max_fill_ms: 10,
                    },
                    ..EngineConfig::default()
                },
                "batch.max_size",
            ),
            (
                EngineConfig {
                    batch: BatchConfig {
                        max_size: 10,
                        max_fill_ms: 0,
                    },
                    ..EngineConfig::default()
                },
                "batch.max_fill_ms",
            ),
            (
                EngineConfig {
                    queue: QueueConfig {
                        envelope_capacity: 0,
                        batch_capacity: 1,
                    },
                    ..EngineConfig::default()
                },
                "queue.envelope_capacity",
            ),
        ];

        for (config, expected_field) in cases {
            match config.validate() {
                Err(ValidationError::InvalidFieldValue { field, .. }) => {
                    assert_eq!(field, expected_field)
                }
                Ok(()) => panic!("expected `{expected_field}` to be rejected"),
            }
        }
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"production_interval_ms": 10, "batch": {"max_size": 5}}"#)
                .unwrap();

        assert_eq!(config.production_interval_ms, 10);
        assert_eq!(config.batch.max_size, 5);
        assert_eq!(config.batch.max_fill_ms, BatchConfig::DEFAULT_MAX_FILL_MS);
        assert_eq!(config.max_workers, EngineConfig::DEFAULT_MAX_WORKERS);
        assert_eq!(config.queue, QueueConfig::default());
    }
}
