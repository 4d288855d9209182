use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rdkafka::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use sensor::error::{EngineError, EngineResult, ErrorKind};
use sensor::sensor_error;
use sensor::sink::Sink;
use sensor::types::{Batch, Envelope};
use serde::Serialize;
use tracing::{debug, info};

/// Sink producing every envelope as a JSON message keyed by its id.
///
/// Messages of a batch are all enqueued on the producer before any delivery report is awaited,
/// so the whole batch travels in as few broker requests as the producer allows.
#[derive(Clone)]
pub struct KafkaSink {
    producer: FutureProducer,
    topic: Arc<str>,
    message_timeout: Duration,
}

impl KafkaSink {
    /// Creates a producer for the comma-separated `brokers` list.
    ///
    /// A message which is not acknowledged within `message_timeout` fails its publish.
    pub fn new(brokers: &str, topic: &str, message_timeout: Duration) -> EngineResult<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", message_timeout.as_millis().to_string())
            .create()
            .map_err(|err| {
                sensor_error!(
                    ErrorKind::ConfigError,
                    "Failed to create Kafka producer",
                    format!("brokers: {brokers}"),
                    source: err
                )
            })?;

        Ok(Self {
            producer,
            topic: topic.into(),
            message_timeout,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    fn delivery_error(&self, err: KafkaError) -> EngineError {
        sensor_error!(
            delivery_error_kind(&err),
            "Kafka message was not delivered",
            format!("topic: {}", self.topic),
            source: err
        )
    }
}

/// Classifies a failed delivery: unreachable brokers are connection failures.
fn delivery_error_kind(err: &KafkaError) -> ErrorKind {
    match err.rdkafka_error_code() {
        Some(
            RDKafkaErrorCode::MessageTimedOut
            | RDKafkaErrorCode::AllBrokersDown
            | RDKafkaErrorCode::BrokerTransportFailure
            | RDKafkaErrorCode::BrokerNotAvailable,
        ) => ErrorKind::SinkConnectionFailed,
        _ => ErrorKind::SinkPublishFailed,
    }
}

impl fmt::Debug for KafkaSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaSink")
            .field("topic", &self.topic)
            .field("message_timeout", &self.message_timeout)
            .finish_non_exhaustive()
    }
}

impl<T> Sink<T> for KafkaSink
where
    T: Serialize + Send + Sync + 'static,
{
    fn name() -> &'static str {
        "kafka"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        let payload = serde_json::to_vec(&envelope)?;
        let record = FutureRecord::to(&self.topic)
            .key(envelope.id.as_str())
            .payload(&payload);

        self.producer
            .send(record, self.message_timeout)
            .await
            .map_err(|(err, _)| self.delivery_error(err))?;

        Ok(())
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        let mut deliveries = Vec::with_capacity(batch.len());

        for envelope in &batch {
            let payload = serde_json::to_vec(envelope)?;
            let record = FutureRecord::to(&self.topic)
                .key(envelope.id.as_str())
                .payload(&payload);

            let delivery = self
                .producer
                .send_result(record)
                .map_err(|(err, _)| self.delivery_error(err))?;
            deliveries.push(delivery);
        }

        for delivery in deliveries {
            match delivery.await {
                Ok(Ok(_)) => {}
                Ok(Err((err, _))) => return Err(self.delivery_error(err)),
                Err(_) => {
                    return Err(sensor_error!(
                        ErrorKind::SinkPublishFailed,
                        "Kafka producer dropped a delivery report",
                        format!("topic: {}", self.topic)
                    ));
                }
            }
        }

        debug!(batch_size = batch.len(), topic = %self.topic, "batch delivered to kafka");

        Ok(())
    }

    async fn close(&self) -> EngineResult<()> {
        let producer = self.producer.clone();
        let timeout = self.message_timeout;

        // Flushing blocks until every in-flight message is acknowledged or times out.
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|err| {
                sensor_error!(
                    ErrorKind::SinkCloseFailed,
                    "Kafka flush task failed",
                    source: err
                )
            })?
            .map_err(|err| {
                sensor_error!(
                    ErrorKind::SinkCloseFailed,
                    "Failed to flush Kafka producer",
                    format!("topic: {}", self.topic),
                    source: err
                )
            })?;

        info!(topic = %self.topic, "kafka producer flushed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sensor::types::EnvelopeBuilder;

    use super::*;

    #[test]
    fn unreachable_brokers_are_connection_failures() {
        assert_eq!(
            delivery_error_kind(&KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageTimedOut
            )),
            ErrorKind::SinkConnectionFailed
        );
        assert_eq!(
            delivery_error_kind(&KafkaError::MessageProduction(
                RDKafkaErrorCode::AllBrokersDown
            )),
            ErrorKind::SinkConnectionFailed
        );
        assert_eq!(
            delivery_error_kind(&KafkaError::MessageProduction(
                RDKafkaErrorCode::MessageSizeTooLarge
            )),
            ErrorKind::SinkPublishFailed
        );
    }

    #[test]
    fn invalid_producer_settings_are_config_errors() {
        let err = KafkaSink::new("localhost:9092", "readings", Duration::from_millis(u64::MAX))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn undeliverable_batch_fails_after_message_timeout() {
        // Nothing listens on port 1, so messages expire in the local queue.
        let sink = KafkaSink::new("127.0.0.1:1", "readings", Duration::from_millis(200)).unwrap();
        let mut builder = EnvelopeBuilder::new("kafka");
        let now = Utc::now();

        let err = tokio::time::timeout(
            Duration::from_secs(30),
            sink.publish_batch(vec![builder.build(1.0, now), builder.build(2.0, now)]),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SinkConnectionFailed);
    }
}
