//! Sensor engine demonstration scenarios.
//!
//! Each scenario pairs a seeder with a domain transform and prints the produced batches as
//! JSON lines on standard output until its run time elapses or Ctrl+C is pressed.

use std::error::Error;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use sensor::engine::Engine;
use sensor::error::EngineResult;
use sensor::source::{LinearSeeder, NormalSeeder, RandomSeeder, Seeder, TimeSeeder, Transform};
use sensor::types::EnvelopeBuilder;
use sensor_config::Environment;
use sensor_config::shared::EngineConfig;
use sensor_sinks::stdout::StdoutSink;
use sensor_telemetry::tracing::init_tracing;
use serde::Serialize;
use tokio::time::sleep;
use tracing::info;

use crate::scenarios::{
    MarketSeeder, financial_metrics, iot_reading, machine_metrics, temperature_reading,
    weather_data,
};

mod scenarios;

#[derive(Debug, Parser)]
#[command(name = "sensor-examples", version, about)]
struct AppArgs {
    /// Scenario to run.
    #[arg(value_enum)]
    scenario: Scenario,
    /// Overrides the run time of the scenario, in seconds.
    #[arg(long)]
    duration_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Scenario {
    /// Server room temperature following a slow sine wave.
    Temperature,
    /// IoT device telemetry driven by uniform noise.
    Iot,
    /// Machine metrics degrading linearly over time.
    Industrial,
    /// Weather station readings around a normal distribution.
    Weather,
    /// Market metrics from a custom cyclic seeder.
    Financial,
    /// Every scenario, one after the other.
    All,
}

fn main() -> Result<(), Box<dyn Error>> {
    // Human readable logs, set before any thread exists.
    Environment::Dev.set();

    let _log_flusher = init_tracing("sensor-examples")?;

    let args = AppArgs::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(main_impl(args))
}

async fn main_impl(args: AppArgs) -> Result<(), Box<dyn Error>> {
    let duration = args.duration_secs.map(Duration::from_secs);

    let scenarios = match args.scenario {
        Scenario::All => vec![
            Scenario::Temperature,
            Scenario::Iot,
            Scenario::Industrial,
            Scenario::Weather,
            Scenario::Financial,
        ],
        scenario => vec![scenario],
    };

    for scenario in scenarios {
        run(scenario, duration).await?;
    }

    Ok(())
}

async fn run(scenario: Scenario, duration: Option<Duration>) -> EngineResult<()> {
    match scenario {
        Scenario::Temperature => {
            let seeder = TimeSeeder::new(1.0, 0.1, 20.0);
            let config = engine_config(1_000, 3);
            let duration = duration.unwrap_or(Duration::from_secs(10));

            run_scenario("temperature", config, seeder, temperature_reading, duration).await
        }
        Scenario::Iot => {
            let seeder = RandomSeeder::new(0.0, 1.0);
            let config = engine_config(500, 5);
            let duration = duration.unwrap_or(Duration::from_secs(8));

            run_scenario("iot", config, seeder, iot_reading, duration).await
        }
        Scenario::Industrial => {
            // Wear grows by about 0.01 per reading at one reading every two seconds.
            let seeder = LinearSeeder::new(0.005, 0.1);
            let config = engine_config(2_000, 2);
            let duration = duration.unwrap_or(Duration::from_secs(12));

            run_scenario("industrial", config, seeder, machine_metrics, duration).await
        }
        Scenario::Weather => {
            let seeder = NormalSeeder::new(0.5, 0.2)?;
            let config = engine_config(3_000, 1);
            let duration = duration.unwrap_or(Duration::from_secs(15));

            run_scenario("weather", config, seeder, weather_data, duration).await
        }
        Scenario::Financial => {
            let seeder = MarketSeeder::new();
            let config = engine_config(1_000, 2);
            let duration = duration.unwrap_or(Duration::from_secs(10));

            run_scenario("financial", config, seeder, financial_metrics, duration).await
        }
        // Expanded by the caller.
        Scenario::All => Ok(()),
    }
}

fn engine_config(production_interval_ms: u64, max_batch_size: usize) -> EngineConfig {
    let mut config = EngineConfig {
        production_interval_ms,
        ..EngineConfig::default()
    };
    config.batch.max_size = max_batch_size;

    config
}

async fn run_scenario<S, F>(
    name: &'static str,
    config: EngineConfig,
    seeder: S,
    transform: F,
    duration: Duration,
) -> EngineResult<()>
where
    S: Seeder + Send + 'static,
    F: Transform + Send + 'static,
    F::Output: Serialize + Send + 'static,
{
    info!(
        scenario = name,
        production_interval_ms = config.production_interval_ms,
        batch_max_size = config.batch.max_size,
        duration_secs = duration.as_secs(),
        "starting scenario"
    );

    let engine = Engine::new(config, seeder, transform, StdoutSink::stdout())?
        .with_envelope_builder(EnvelopeBuilder::new(name));

    let shutdown_tx = engine.shutdown_tx();
    let stopper = tokio::spawn(async move {
        tokio::select! {
            _ = sleep(duration) => info!(scenario = name, "scenario run time elapsed"),
            _ = tokio::signal::ctrl_c() => {
                info!(scenario = name, "ctrl+c received, stopping scenario");
            }
        }
        shutdown_tx.shutdown();
    });

    let result = engine.start().await;

    stopper.abort();
    let _ = stopper.await;

    info!(scenario = name, "scenario finished");

    result
}
