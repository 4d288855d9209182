//! Synthetic sensor data pipeline.
//!
//! An [`engine::Engine`] produces [`types::Envelope`]s at a fixed rate from a
//! [`source::Seeder`] and a [`source::Transform`], groups them into batches that are flushed
//! when full or when they have waited long enough, and hands the batches to a pool of
//! publishers writing into a [`sink::Sink`].
//!
//! Stages are connected through bounded queues, so a slow sink throttles generation. On
//! shutdown every envelope already queued is still delivered before the sink is closed.
pub mod concurrency;
pub mod engine;
pub mod error;
mod macros;
pub mod metrics;
pub mod sink;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;
