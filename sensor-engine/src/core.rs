use std::future::pending;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sensor::engine::Engine;
#[cfg(not(feature = "kafka"))]
use sensor::error::ErrorKind;
#[cfg(not(feature = "kafka"))]
use sensor::sensor_error;
use sensor::sink::Sink;
use sensor::sink::memory::MemorySink;
use sensor::source::{ConfiguredSeeder, Seeder, Transform};
use sensor::types::EnvelopeBuilder;
use sensor_config::shared::{
    EmitterConfig, EngineConfig, GeneratorConfig, SinkConfig, SinkConfigWithoutSecrets,
    TransformConfig,
};
use sensor_sinks::http::HttpSink;
#[cfg(feature = "kafka")]
use sensor_sinks::kafka::KafkaSink;
use sensor_sinks::stdout::StdoutSink;
use serde::Serialize;
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::EmitterResult;

/// Payload emitted by the service: the seeded value after the configured linear transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub value: f64,
}

/// Returns the transform mapping a seeded value to a [`Reading`].
pub fn reading_transform(config: TransformConfig) -> impl Fn(f64, DateTime<Utc>) -> Reading {
    let TransformConfig { scale, offset } = config;

    move |input, _| Reading {
        value: input * scale + offset,
    }
}

/// Starts the engine described by `config` and runs it until it is asked to stop.
///
/// The sink is picked from the configuration. Every sink gets its own monomorphized engine.
pub async fn start_emitter_with_config(config: EmitterConfig) -> EmitterResult<()> {
    info!("starting sensor engine service");

    log_config(&config);

    let run_for = config.run_for_ms.map(Duration::from_millis);
    let seeder = ConfiguredSeeder::from_config(&config.generator.seeder)?;
    let transform = reading_transform(config.generator.transform.clone());
    let builder = EnvelopeBuilder::new(config.generator.id_prefix.clone());

    match config.sink {
        SinkConfig::Stdout => {
            let sink = StdoutSink::stdout();

            let engine = Engine::new(config.engine, seeder, transform, sink)?
                .with_envelope_builder(builder);
            start_engine(engine, run_for).await?;
        }
        SinkConfig::Memory => {
            let sink = MemorySink::new();

            let engine = Engine::new(config.engine, seeder, transform, sink.clone())?
                .with_envelope_builder(builder);
            start_engine(engine, run_for).await?;

            info!(
                envelopes = sink.batched_envelopes().await.len(),
                "memory sink contents discarded"
            );
        }
        SinkConfig::Http {
            endpoint,
            timeout_ms,
            api_key,
        } => {
            let sink = HttpSink::new(endpoint, Duration::from_millis(timeout_ms), api_key)?;

            let engine = Engine::new(config.engine, seeder, transform, sink)?
                .with_envelope_builder(builder);
            start_engine(engine, run_for).await?;
        }
        #[cfg(feature = "kafka")]
        SinkConfig::Kafka {
            brokers,
            topic,
            message_timeout_ms,
        } => {
            let sink = KafkaSink::new(&brokers, &topic, Duration::from_millis(message_timeout_ms))?;

            let engine = Engine::new(config.engine, seeder, transform, sink)?
                .with_envelope_builder(builder);
            start_engine(engine, run_for).await?;
        }
        #[cfg(not(feature = "kafka"))]
        SinkConfig::Kafka { .. } => {
            return Err(sensor_error!(
                ErrorKind::ConfigError,
                "Kafka sink is not available",
                "sensor-engine was built without the `kafka` feature"
            )
            .into());
        }
    }

    info!("sensor engine service stopped");

    Ok(())
}

fn log_config(config: &EmitterConfig) {
    log_engine_config(&config.engine);
    log_generator_config(&config.generator);
    log_sink_config(&config.sink);

    if let Some(run_for_ms) = config.run_for_ms {
        debug!(run_for_ms, "engine stops after a fixed duration");
    }
}

fn log_engine_config(config: &EngineConfig) {
    debug!(
        production_interval_ms = config.production_interval_ms,
        batch_max_size = config.batch.max_size,
        batch_max_fill_ms = config.batch.max_fill_ms,
        max_workers = config.max_workers,
        envelope_capacity = config.queue.envelope_capacity,
        batch_capacity = config.queue.batch_capacity,
        "engine config"
    );
}

fn log_generator_config(config: &GeneratorConfig) {
    debug!(
        id_prefix = %config.id_prefix,
        seeder = ?config.seeder,
        scale = config.transform.scale,
        offset = config.transform.offset,
        "generator config"
    );
}

fn log_sink_config(config: &SinkConfig) {
    // Secrets never reach the logs.
    let config = SinkConfigWithoutSecrets::from(config.clone());
    match config {
        SinkConfigWithoutSecrets::Stdout => debug!("using stdout sink"),
        SinkConfigWithoutSecrets::Memory => debug!("using memory sink"),
        SinkConfigWithoutSecrets::Http {
            endpoint,
            timeout_ms,
        } => debug!(%endpoint, timeout_ms, "using http sink"),
        SinkConfigWithoutSecrets::Kafka {
            brokers,
            topic,
            message_timeout_ms,
        } => debug!(%brokers, %topic, message_timeout_ms, "using kafka sink"),
    }
}

/// Runs `engine` until SIGINT, SIGTERM or the end of `run_for`, whichever comes first.
#[tracing::instrument(skip(engine))]
async fn start_engine<S, F, K>(
    engine: Engine<S, F, K>,
    run_for: Option<Duration>,
) -> EmitterResult<()>
where
    S: Seeder + Send + 'static,
    F: Transform + Send + 'static,
    F::Output: Send + 'static,
    K: Sink<F::Output> + Clone + Send + Sync + 'static,
{
    let shutdown_tx = engine.shutdown_tx();
    let shutdown_handle = tokio::spawn(async move {
        wait_for_stop_request(run_for).await;
        shutdown_tx.shutdown();
    });

    let result = engine.start().await;

    // The engine only returns after shutdown, so the task has normally finished already.
    shutdown_handle.abort();
    let _ = shutdown_handle.await;

    result?;

    Ok(())
}

async fn wait_for_stop_request(run_for: Option<Duration>) {
    // SIGTERM is what container runtimes send before killing the process.
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => Some(sigterm),
        Err(err) => {
            warn!(error = %err, "failed to register sigterm handler");
            None
        }
    };

    let sigterm_received = async {
        match sigterm.as_mut() {
            Some(sigterm) => {
                sigterm.recv().await;
            }
            None => pending::<()>().await,
        }
    };
    let run_elapsed = async {
        match run_for {
            Some(run_for) => sleep(run_for).await,
            None => pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("sigint (ctrl+c) received, shutting down engine");
        }
        _ = sigterm_received => {
            info!("sigterm received, shutting down engine");
        }
        _ = run_elapsed => {
            info!("run duration elapsed, shutting down engine");
        }
    }
}

#[cfg(test)]
mod tests {
    use sensor::test_utils::counting_seeder::CountingSeeder;
    use sensor_config::shared::BatchConfig;

    use super::*;

    #[test]
    fn reading_applies_scale_then_offset() {
        let transform = reading_transform(TransformConfig {
            scale: 2.0,
            offset: -1.0,
        });

        assert_eq!(transform.transform(3.0, Utc::now()), Reading { value: 5.0 });
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn engine_stops_after_run_duration() {
        let sink = MemorySink::new();
        let config = EngineConfig {
            production_interval_ms: 5,
            batch: BatchConfig {
                max_size: 4,
                max_fill_ms: 20,
            },
            max_workers: 2,
            ..EngineConfig::default()
        };
        let engine = Engine::new(
            config,
            CountingSeeder::new(),
            reading_transform(TransformConfig::default()),
            sink.clone(),
        )
        .unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            start_engine(engine, Some(Duration::from_millis(60))),
        )
        .await
        .unwrap()
        .unwrap();

        let readings = sink.batched_envelopes().await;
        assert!(!readings.is_empty());
        assert_eq!(readings[0].data, Reading { value: 1.0 });
        assert_eq!(sink.close_calls().await, 1);
    }
}
