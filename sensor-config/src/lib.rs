//! Configuration types and loading for the sensor data engine.
//!
//! The [`shared`] module holds the configuration structures consumed by the engine and the
//! service binary, while [`load_config`] assembles them from configuration files and
//! `APP_`-prefixed environment variables.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{LoadConfigError, load_config, load_config_from};
