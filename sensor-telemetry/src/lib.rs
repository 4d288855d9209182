//! Logging and metrics initialization shared by the sensor binaries and tests.

pub mod metrics;
pub mod tracing;
