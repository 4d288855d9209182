//! Sink implementations for the sensor engine.
//!
//! Provides [`sensor::sink::Sink`] backends writing envelopes to a byte stream, such as
//! standard output, posting them to an HTTP endpoint or producing them to a Kafka topic.

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "kafka")]
pub mod kafka;
pub mod stdout;
