//! Shared configuration types for the sensor data engine.

mod base;
mod batch;
mod emitter;
mod engine;
mod generator;
mod sink;

pub use base::ValidationError;
pub use batch::BatchConfig;
pub use emitter::{EmitterConfig, MetricsConfig};
pub use engine::{EngineConfig, QueueConfig};
pub use generator::{GeneratorConfig, SeederConfig, TransformConfig};
pub use sink::{SinkConfig, SinkConfigWithoutSecrets};
