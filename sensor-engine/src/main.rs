//! Sensor engine service binary.
//!
//! Loads the service configuration, initializes telemetry and runs one engine until it
//! receives SIGINT or SIGTERM, or until the configured run duration elapses.

use std::process::ExitCode;

use sensor_config::shared::EmitterConfig;
use sensor_telemetry::metrics::init_metrics;
use sensor_telemetry::tracing::init_tracing;
use tracing::{error, info};

use crate::config::load_emitter_config;
use crate::core::start_emitter_with_config;
use crate::error::{EmitterError, EmitterResult};

mod config;
mod core;
mod error;

/// Entry point for the sensor engine service.
///
/// Failures are rendered as a report on stderr and turned into a non-zero exit code.
fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration and telemetry, then starts the async runtime.
fn run() -> EmitterResult<()> {
    let emitter_config = load_emitter_config()?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(EmitterError::config)?;

    match &emitter_config.metrics {
        Some(metrics_config) => {
            init_metrics(metrics_config.port, env!("CARGO_BIN_NAME"))
                .map_err(EmitterError::config)?;
            info!(port = metrics_config.port, "prometheus exporter listening");
        }
        None => info!("metrics not configured, skipping exporter"),
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(emitter_config))
}

async fn async_main(emitter_config: EmitterConfig) -> EmitterResult<()> {
    if let Err(err) = start_emitter_with_config(emitter_config).await {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
