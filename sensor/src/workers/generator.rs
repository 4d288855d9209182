use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, info, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{EngineResult, ErrorKind};
use crate::metrics::{QUALITY_LABEL, SENSOR_ENVELOPES_GENERATED_TOTAL};
use crate::sensor_error;
use crate::source::{Seeder, Transform};
use crate::types::{Envelope, EnvelopeBuilder};
use crate::workers::base::{WorkerHandle, WorkerType};

/// Handle to the running generator worker.
#[derive(Debug)]
pub struct GeneratorWorkerHandle {
    handle: JoinHandle<EngineResult<()>>,
}

impl WorkerHandle for GeneratorWorkerHandle {
    async fn wait(self) -> EngineResult<()> {
        self.handle.await.map_err(|err| {
            sensor_error!(
                ErrorKind::GeneratorWorkerPanic,
                "Generator worker panicked",
                err
            )
        })?
    }
}

/// Worker producing one envelope per tick of a fixed-interval timer.
///
/// Envelopes are pushed onto the bounded envelope queue. A full queue suspends the worker,
/// which is how a slow sink throttles generation. The worker stops at the first shutdown
/// check after the signal and drops its sender, closing the queue for the batcher.
pub struct GeneratorWorker<S, F>
where
    F: Transform,
{
    interval: Duration,
    seeder: S,
    transform: F,
    builder: EnvelopeBuilder,
    envelope_tx: mpsc::Sender<Envelope<F::Output>>,
    shutdown_rx: ShutdownRx,
}

impl<S, F> GeneratorWorker<S, F>
where
    S: Seeder + Send + 'static,
    F: Transform + Send + 'static,
    F::Output: Send + 'static,
{
    pub fn new(
        interval: Duration,
        seeder: S,
        transform: F,
        builder: EnvelopeBuilder,
        envelope_tx: mpsc::Sender<Envelope<F::Output>>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            interval,
            seeder,
            transform,
            builder,
            envelope_tx,
            shutdown_rx,
        }
    }

    /// Spawns the worker on the current runtime.
    pub fn spawn(self) -> GeneratorWorkerHandle {
        let span = tracing::info_span!("generator_worker", worker = %WorkerType::Generator);
        let handle = tokio::spawn(self.run().instrument(span));

        GeneratorWorkerHandle { handle }
    }

    async fn run(mut self) -> EngineResult<()> {
        info!(interval_ms = self.interval.as_millis() as u64, "starting generator worker");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait() => break,
                _ = ticker.tick() => {}
            }

            let input = self.seeder.generate();
            let timestamp = Utc::now();
            let data = self.transform.transform(input, timestamp);
            let envelope = self.builder.build(data, timestamp);
            let quality = envelope.quality;

            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait() => {
                    debug!("shutdown requested, dropping pending envelope");
                    break;
                }
                result = self.envelope_tx.send(envelope) => {
                    if result.is_err() {
                        warn!("envelope queue closed, stopping generator worker");
                        break;
                    }
                }
            }

            counter!(SENSOR_ENVELOPES_GENERATED_TOTAL, QUALITY_LABEL => quality.as_str())
                .increment(1);
        }

        info!(built = self.builder.built(), "generator worker stopped");

        Ok(())
    }
}
