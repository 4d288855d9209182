use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

const fn default_http_timeout_ms() -> u64 {
    SinkConfig::DEFAULT_HTTP_TIMEOUT_MS
}

const fn default_kafka_message_timeout_ms() -> u64 {
    SinkConfig::DEFAULT_KAFKA_MESSAGE_TIMEOUT_MS
}

/// Configuration of the sink receiving published envelopes.
///
/// This intentionally does not implement [`Serialize`] to avoid accidentally
/// leaking secrets in the config into serialized forms.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Writes one JSON line per envelope to standard output.
    Stdout,
    /// Keeps every published envelope in memory.
    Memory,
    /// Posts envelopes as JSON to an HTTP endpoint.
    Http {
        /// Target URL of the POST requests.
        endpoint: String,
        /// Per-request timeout in milliseconds.
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
        /// Optional key sent in the `apikey` header.
        api_key: Option<SecretString>,
    },
    /// Produces envelopes as JSON messages keyed by envelope id.
    Kafka {
        /// Comma-separated `host:port` list of bootstrap brokers.
        brokers: String,
        topic: String,
        /// Time after which an unacknowledged message fails its publish.
        #[serde(default = "default_kafka_message_timeout_ms")]
        message_timeout_ms: u64,
    },
}

impl SinkConfig {
    /// Default HTTP request timeout in milliseconds.
    pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;

    /// Default Kafka message delivery timeout in milliseconds.
    pub const DEFAULT_KAFKA_MESSAGE_TIMEOUT_MS: u64 = 5000;

    /// Validates sink configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SinkConfig::Stdout | SinkConfig::Memory => {}
            SinkConfig::Http {
                endpoint,
                timeout_ms,
                ..
            } => {
                if endpoint.is_empty() {
                    return Err(ValidationError::invalid(
                        "sink.endpoint",
                        "must not be empty",
                    ));
                }

                if *timeout_ms == 0 {
                    return Err(ValidationError::invalid(
                        "sink.timeout_ms",
                        "must be greater than 0",
                    ));
                }
            }
            SinkConfig::Kafka {
                brokers,
                topic,
                message_timeout_ms,
            } => {
                if brokers.split(',').all(|broker| broker.trim().is_empty()) {
                    return Err(ValidationError::invalid(
                        "sink.brokers",
                        "must list at least one broker",
                    ));
                }

                if topic.is_empty() {
                    return Err(ValidationError::invalid("sink.topic", "must not be empty"));
                }

                if *message_timeout_ms == 0 {
                    return Err(ValidationError::invalid(
                        "sink.message_timeout_ms",
                        "must be greater than 0",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig::Stdout
    }
}

/// Same as [`SinkConfig`] but without secrets. This type
/// implements [`Serialize`] because it does not contain secrets
/// so is safe to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfigWithoutSecrets {
    Stdout,
    Memory,
    Http {
        endpoint: String,
        timeout_ms: u64,
    },
    Kafka {
        brokers: String,
        topic: String,
        message_timeout_ms: u64,
    },
}

impl From<SinkConfig> for SinkConfigWithoutSecrets {
    fn from(value: SinkConfig) -> Self {
        match value {
            SinkConfig::Stdout => SinkConfigWithoutSecrets::Stdout,
            SinkConfig::Memory => SinkConfigWithoutSecrets::Memory,
            SinkConfig::Http {
                endpoint,
                timeout_ms,
                api_key: _,
            } => SinkConfigWithoutSecrets::Http {
                endpoint,
                timeout_ms,
            },
            SinkConfig::Kafka {
                brokers,
                topic,
                message_timeout_ms,
            } => SinkConfigWithoutSecrets::Kafka {
                brokers,
                topic,
                message_timeout_ms,
            },
        }
    }
}
