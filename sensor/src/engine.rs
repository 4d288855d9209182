use sensor_config::shared::EngineConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::error::{EngineError, EngineResult};
use crate::sink::Sink;
use crate::source::{Seeder, Transform};
use crate::types::EnvelopeBuilder;
use crate::workers::base::WorkerHandle;
use crate::workers::batcher::BatcherWorker;
use crate::workers::generator::GeneratorWorker;
use crate::workers::publisher::PublisherPool;

/// Generates envelopes, batches them and publishes the batches to a sink.
///
/// The engine wires three stages with two bounded queues:
///
/// ```text
/// generator -> envelope queue -> batcher -> batch queue -> publisher pool -> sink
/// ```
///
/// It runs until shutdown is signalled through [`Engine::shutdown_tx`], then stops the
/// stages in order so that every envelope accepted by the envelope queue reaches the sink
/// before the sink is closed.
#[derive(Debug)]
pub struct Engine<S, F, K> {
    config: EngineConfig,
    seeder: S,
    transform: F,
    sink: K,
    builder: EnvelopeBuilder,
    shutdown_tx: ShutdownTx,
}

impl<S, F, K> Engine<S, F, K>
where
    S: Seeder + Send + 'static,
    F: Transform + Send + 'static,
    F::Output: Send + 'static,
    K: Sink<F::Output> + Clone + Send + Sync + 'static,
{
    /// Creates an engine, failing if `config` is invalid.
    pub fn new(config: EngineConfig, seeder: S, transform: F, sink: K) -> EngineResult<Self> {
        config.validate()?;

        // The receiver is dropped on purpose, every stage subscribes to the sender.
        let (shutdown_tx, _) = create_shutdown_channel();

        Ok(Self {
            config,
            seeder,
            transform,
            sink,
            builder: EnvelopeBuilder::default(),
            shutdown_tx,
        })
    }

    /// Replaces the envelope builder, e.g. to change the id prefix or seed quality draws.
    pub fn with_envelope_builder(mut self, builder: EnvelopeBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Makes the engine observe `shutdown_tx` instead of its own signal.
    ///
    /// Useful when the signal must exist before the engine, e.g. when a signal handler or
    /// one of the stages owns it.
    pub fn with_shutdown_tx(mut self, shutdown_tx: ShutdownTx) -> Self {
        self.shutdown_tx = shutdown_tx;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns a handle able to stop the engine, including before it starts.
    pub fn shutdown_tx(&self) -> ShutdownTx {
        self.shutdown_tx.clone()
    }

    /// Signals shutdown.
    pub fn shutdown(&self) {
        self.shutdown_tx.shutdown();
    }

    /// Runs the engine until shutdown is signalled and every stage has drained.
    ///
    /// After the signal, the generator stops first, which closes the envelope queue. The
    /// batcher then drains it and closes the batch queue, the publishers drain that one, and
    /// finally the sink is closed exactly once.
    ///
    /// Publish failures are logged and never returned. The returned error carries a sink close
    /// failure and any worker panic.
    pub async fn start(self) -> EngineResult<()> {
        info!(
            production_interval_ms = self.config.production_interval_ms,
            batch_max_size = self.config.batch.max_size,
            batch_max_fill_ms = self.config.batch.max_fill_ms,
            max_workers = self.config.max_workers,
            sink = K::name(),
            "starting engine"
        );

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let (envelope_tx, envelope_rx) = mpsc::channel(self.config.queue.envelope_capacity);
        let (batch_tx, batch_rx) = mpsc::channel(self.config.queue.batch_capacity);

        let generator = GeneratorWorker::new(
            self.config.production_interval(),
            self.seeder,
            self.transform,
            self.builder,
            envelope_tx,
            shutdown_rx.clone(),
        )
        .spawn();
        let batcher = BatcherWorker::new(
            self.config.batch.clone(),
            envelope_rx,
            batch_tx,
            shutdown_rx.clone(),
        )
        .spawn();
        let publishers = PublisherPool::new(self.config.max_workers, self.sink.clone(), batch_rx)
            .spawn();

        shutdown_rx.wait().await;
        info!("shutdown requested, draining engine");

        let mut errors: Vec<EngineError> = Vec::new();

        // The generator owns the only envelope sender, so the queue closes when it returns.
        if let Err(err) = generator.wait().await {
            errors.push(err);
        }
        debug!("generator stopped, envelope queue closed");

        // Likewise the batcher owns the only batch sender.
        if let Err(err) = batcher.wait().await {
            errors.push(err);
        }
        debug!("batcher stopped, batch queue closed");

        if let Err(err) = publishers.wait().await {
            errors.push(err);
        }
        debug!("publishers stopped, closing sink");

        if let Err(err) = self.sink.close().await {
            error!(error = %err, sink = K::name(), "failed to close sink");
            errors.push(err);
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        info!("engine stopped");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use chrono::{DateTime, Utc};
    use sensor_config::shared::{BatchConfig, QueueConfig};
    use sensor_telemetry::tracing::init_test_tracing;
    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::error::ErrorKind;
    use crate::sink::memory::MemorySink;
    use crate::test_utils::counting_seeder::CountingSeeder;
    use crate::test_utils::faulty_sink::FaultySink;
    use crate::test_utils::gated_sink::GatedSink;
    use crate::test_utils::test_sink_wrapper::TestSinkWrapper;
    use crate::types::Batch;

    fn identity(value: f64, _: DateTime<Utc>) -> f64 {
        value
    }

    fn config(
        interval_ms: u64,
        max_size: usize,
        max_fill_ms: u64,
        workers: usize,
    ) -> EngineConfig {
        EngineConfig {
            production_interval_ms: interval_ms,
            batch: BatchConfig {
                max_size,
                max_fill_ms,
            },
            max_workers: workers,
            queue: QueueConfig::default(),
        }
    }

    fn sequence_numbers(batches: &[Batch<f64>]) -> Vec<u64> {
        batches
            .iter()
            .flatten()
            .map(|envelope| {
                envelope
                    .id
                    .rsplit('-')
                    .next()
                    .and_then(|n| n.parse().ok())
                    .unwrap()
            })
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn short_run_publishes_bounded_batches_and_closes_once() {
        init_test_tracing();

        let sink = TestSinkWrapper::wrap(MemorySink::<f64>::new());
        let engine = Engine::new(
            config(10, 5, 50, 2),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap();
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(100)).await;
        shutdown_tx.shutdown();

        timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let batches = sink.batches().await;
        assert!(!batches.is_empty());
        assert!(
            batches
                .iter()
                .all(|batch| !batch.is_empty() && batch.len() <= 5)
        );
        assert_eq!(sink.close_calls().await, 1);
        assert!(!sink.closed_while_publishing().await);
        assert!(sink.last_call_is_close().await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn seven_envelopes_are_delivered_as_three_three_one() {
        init_test_tracing();

        let sink = MemorySink::<f64>::new();

        // The eighth draw signals shutdown, so its envelope never enters the queue.
        let (shutdown_tx, _) = create_shutdown_channel();
        let seeder = CountingSeeder::new().shutdown_on_draw(8, shutdown_tx.clone());
        let draws = seeder.draws();
        let engine = Engine::new(config(5, 3, 1_000, 1), seeder, identity, sink.clone())
            .unwrap()
            .with_shutdown_tx(shutdown_tx);

        timeout(Duration::from_secs(5), engine.start())
            .await
            .unwrap()
            .unwrap();

        let sizes: Vec<usize> = sink.batches().await.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert_eq!(draws.get(), 8);

        let values: Vec<f64> = sink
            .batched_envelopes()
            .await
            .into_iter()
            .map(|envelope| envelope.data)
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(sink.close_calls().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn already_cancelled_start_returns_promptly() {
        init_test_tracing();

        let sink = MemorySink::<f64>::new();
        let engine = Engine::new(
            config(10, 5, 50, 3),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap();
        engine.shutdown();

        timeout(Duration::from_millis(500), engine.start())
            .await
            .unwrap()
            .unwrap();

        assert!(sink.batches().await.is_empty());
        assert_eq!(sink.close_calls().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn single_worker_delivers_every_envelope_in_order() {
        init_test_tracing();

        let sink = MemorySink::<f64>::new();
        let engine = Engine::new(
            config(2, 4, 15, 1),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap()
        .with_envelope_builder(EnvelopeBuilder::new("ordered").with_seed(11));
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(80)).await;
        shutdown_tx.shutdown();
        timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let batches = sink.batches().await;
        let numbers = sequence_numbers(&batches);
        assert!(!numbers.is_empty());
        let expected: Vec<u64> = (0..numbers.len() as u64).collect();
        assert_eq!(numbers, expected);
        assert!(
            batches
                .iter()
                .flatten()
                .all(|envelope| envelope.id.starts_with("ordered-"))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn many_workers_neither_lose_nor_duplicate_envelopes() {
        init_test_tracing();

        let sink = MemorySink::<f64>::new();
        let engine = Engine::new(
            config(1, 3, 10, 4),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap();
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(60)).await;
        shutdown_tx.shutdown();
        timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let mut numbers = sequence_numbers(&sink.batches().await);
        let unique: HashSet<u64> = numbers.iter().copied().collect();
        assert_eq!(unique.len(), numbers.len());

        numbers.sort_unstable();
        let expected: Vec<u64> = (0..numbers.len() as u64).collect();
        assert_eq!(numbers, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn slow_sink_applies_backpressure_without_losing_data() {
        init_test_tracing();

        let sink = GatedSink::new(MemorySink::<f64>::new());
        let mut engine_config = config(1, 2, 5, 1);
        engine_config.queue = QueueConfig {
            envelope_capacity: 2,
            batch_capacity: 1,
        };

        let seeder = CountingSeeder::new();
        let draws = seeder.draws();
        let engine = Engine::new(engine_config, seeder, identity, sink.clone()).unwrap();
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(100)).await;

        // With the sink blocked, at most a handful of envelopes fit in the queues and the
        // batcher, so generation stalls.
        let stalled_at = draws.get();
        assert!(stalled_at <= 12, "generator kept drawing: {stalled_at}");

        shutdown_tx.shutdown();
        sink.open();

        timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let delivered = sink.inner().batched_envelopes().await.len() as u64;
        assert!(delivered >= stalled_at.saturating_sub(1));
        assert!(delivered <= draws.get());
        assert_eq!(sink.inner().close_calls().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn publish_failures_do_not_stop_the_engine() {
        init_test_tracing();

        let sink = FaultySink::new(MemorySink::<f64>::new()).fail_publishes([0, 2]);
        let engine = Engine::new(
            config(2, 2, 10, 1),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap();
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(80)).await;
        shutdown_tx.shutdown();

        timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let attempts = sink.publish_attempts();
        assert!(attempts >= 3, "only {attempts} publish attempts");
        assert_eq!(
            sink.inner().batches().await.len(),
            attempts - 2,
            "failed batches must be dropped, others delivered"
        );
        assert_eq!(sink.inner().close_calls().await, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn close_failure_is_returned() {
        init_test_tracing();

        let sink = FaultySink::new(MemorySink::<f64>::new()).fail_close();
        let engine = Engine::new(
            config(5, 10, 20, 2),
            CountingSeeder::new(),
            identity,
            sink.clone(),
        )
        .unwrap();
        let shutdown_tx = engine.shutdown_tx();

        let run = tokio::spawn(engine.start());
        sleep(Duration::from_millis(30)).await;
        shutdown_tx.shutdown();

        let err = timeout(Duration::from_secs(5), run)
            .await
            .unwrap()
            .unwrap()
            .unwrap_err();

        assert_eq!(err.kinds(), vec![ErrorKind::SinkCloseFailed]);
        assert_eq!(sink.close_attempts(), 1);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let err = Engine::new(
            config(0, 5, 50, 1),
            CountingSeeder::new(),
            identity as fn(f64, DateTime<Utc>) -> f64,
            MemorySink::<f64>::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = Engine::new(
            config(10, 5, 50, 0),
            CountingSeeder::new(),
            identity as fn(f64, DateTime<Utc>) -> f64,
            MemorySink::<f64>::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);
    }
}
