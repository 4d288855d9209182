use std::mem;
use std::time::Duration;

use metrics::{counter, histogram};
use sensor_config::shared::BatchConfig;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{Instrument, debug, info};

use crate::bail;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::{EngineResult, ErrorKind};
use crate::metrics::{FLUSH_REASON_LABEL, SENSOR_BATCH_SIZE, SENSOR_BATCHES_FLUSHED_TOTAL};
use crate::sensor_error;
use crate::types::{Batch, Envelope};
use crate::workers::base::{WorkerHandle, WorkerType};

/// Why the batcher emitted a batch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum FlushReason {
    /// The batch reached its maximum size.
    Size,
    /// The batch timeout elapsed.
    Timeout,
    /// Shutdown was signalled.
    Shutdown,
    /// The envelope queue was closed.
    Drain,
}

impl FlushReason {
    fn as_str(&self) -> &'static str {
        match self {
            FlushReason::Size => "size",
            FlushReason::Timeout => "timeout",
            FlushReason::Shutdown => "shutdown",
            FlushReason::Drain => "drain",
        }
    }
}

/// Handle to the running batcher worker.
#[derive(Debug)]
pub struct BatcherWorkerHandle {
    handle: JoinHandle<EngineResult<()>>,
}

impl WorkerHandle for BatcherWorkerHandle {
    async fn wait(self) -> EngineResult<()> {
        self.handle.await.map_err(|err| {
            sensor_error!(ErrorKind::BatcherWorkerPanic, "Batcher worker panicked", err)
        })?
    }
}

/// Worker grouping envelopes into batches under a size-or-timeout policy.
///
/// A batch is emitted as soon as it holds `max_size` envelopes, or when the timeout ticks
/// while it is non-empty. Envelopes keep their generation order and each one lands in exactly
/// one batch.
///
/// On shutdown the pending batch is flushed and the worker keeps draining the envelope queue
/// until the generator closes it, then flushes whatever is left and closes the batch queue.
#[derive(Debug)]
pub struct BatcherWorker<T> {
    config: BatchConfig,
    envelope_rx: mpsc::Receiver<Envelope<T>>,
    batch_tx: mpsc::Sender<Batch<T>>,
    shutdown_rx: ShutdownRx,
}

impl<T> BatcherWorker<T>
where
    T: Send + 'static,
{
    pub fn new(
        config: BatchConfig,
        envelope_rx: mpsc::Receiver<Envelope<T>>,
        batch_tx: mpsc::Sender<Batch<T>>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            config,
            envelope_rx,
            batch_tx,
            shutdown_rx,
        }
    }

    /// Spawns the worker on the current runtime.
    pub fn spawn(self) -> BatcherWorkerHandle {
        let span = tracing::info_span!("batcher_worker", worker = %WorkerType::Batcher);
        let handle = tokio::spawn(self.run().instrument(span));

        BatcherWorkerHandle { handle }
    }

    async fn run(mut self) -> EngineResult<()> {
        let max_size = self.config.max_size;
        let timeout = Duration::from_millis(self.config.max_fill_ms);
        info!(
            max_size,
            timeout_ms = self.config.max_fill_ms,
            "starting batcher worker"
        );

        let mut batch = Vec::new();
        let mut ticker = interval_at(Instant::now() + timeout, timeout);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut draining = false;

        loop {
            tokio::select! {
                biased;

                envelope = self.envelope_rx.recv() => {
                    let Some(envelope) = envelope else {
                        self.flush(&mut batch, FlushReason::Drain).await?;
                        break;
                    };

                    batch.push(envelope);
                    if batch.len() >= max_size {
                        self.flush(&mut batch, FlushReason::Size).await?;
                    }
                }
                _ = ticker.tick() => {
                    self.flush(&mut batch, FlushReason::Timeout).await?;
                }
                _ = self.shutdown_rx.wait(), if !draining => {
                    debug!(pending = batch.len(), "shutdown requested, draining envelope queue");
                    self.flush(&mut batch, FlushReason::Shutdown).await?;
                    draining = true;
                }
            }
        }

        info!("batcher worker stopped");

        Ok(())
    }

    /// Sends the pending batch downstream and starts a new one.
    ///
    /// Does nothing when the batch is empty.
    async fn flush(&self, batch: &mut Batch<T>, reason: FlushReason) -> EngineResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let batch = mem::take(batch);
        let batch_size = batch.len();

        debug!(batch_size, reason = reason.as_str(), "flushing batch");

        if self.batch_tx.send(batch).await.is_err() {
            bail!(
                ErrorKind::InvalidState,
                "Batch queue closed while the batcher was running",
                format!("{batch_size} envelopes were dropped")
            );
        }

        counter!(SENSOR_BATCHES_FLUSHED_TOTAL, FLUSH_REASON_LABEL => reason.as_str()).increment(1);
        histogram!(SENSOR_BATCH_SIZE).record(batch_size as f64);

        Ok(())
    }
}
