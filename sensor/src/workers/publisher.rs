use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, info};

use crate::error::{EngineResult, ErrorKind};
use crate::metrics::{
    SENSOR_BATCHES_PUBLISHED_TOTAL, SENSOR_ENVELOPES_PUBLISHED_TOTAL,
    SENSOR_PUBLISH_DURATION_SECONDS, SENSOR_PUBLISH_FAILURES_TOTAL, SINK_LABEL,
};
use crate::sensor_error;
use crate::sink::Sink;
use crate::types::Batch;
use crate::workers::base::{WorkerHandle, WorkerType};

/// Receiving end of the batch queue, shared by every publisher worker.
type SharedBatchReceiver<T> = Arc<Mutex<mpsc::Receiver<Batch<T>>>>;

/// Handle to the running publisher workers.
#[derive(Debug)]
pub struct PublisherPoolHandle {
    join_set: JoinSet<EngineResult<()>>,
}

impl WorkerHandle for PublisherPoolHandle {
    /// Waits for every publisher worker and collects their errors.
    async fn wait(mut self) -> EngineResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("publisher worker task was cancelled");
                    } else {
                        errors.push(sensor_error!(
                            ErrorKind::PublisherWorkerPanic,
                            "Publisher worker panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

/// Fixed-size pool of workers forwarding batches to the sink.
///
/// Workers race to dequeue batches, so with more than one worker the sink may receive
/// batches out of generation order. A rejected batch is logged and dropped: the worker moves
/// on to the next one. Workers ignore the shutdown signal and exit once the batch queue is
/// closed and empty, which guarantees every emitted batch reaches the sink.
#[derive(Debug)]
pub struct PublisherPool<T, K> {
    max_workers: usize,
    sink: K,
    batch_rx: mpsc::Receiver<Batch<T>>,
}

impl<T, K> PublisherPool<T, K>
where
    T: Send + 'static,
    K: Sink<T> + Clone + Send + Sync + 'static,
{
    pub fn new(max_workers: usize, sink: K, batch_rx: mpsc::Receiver<Batch<T>>) -> Self {
        Self {
            max_workers,
            sink,
            batch_rx,
        }
    }

    /// Spawns `max_workers` publisher workers on the current runtime.
    pub fn spawn(self) -> PublisherPoolHandle {
        info!(
            max_workers = self.max_workers,
            sink = K::name(),
            "starting publisher workers"
        );

        let batch_rx = Arc::new(Mutex::new(self.batch_rx));
        let mut join_set = JoinSet::new();

        for id in 0..self.max_workers {
            let worker_type = WorkerType::Publisher { id };
            let worker = PublisherWorker {
                sink: self.sink.clone(),
                batch_rx: batch_rx.clone(),
                _phantom: PhantomData,
            };

            let span = tracing::info_span!("publisher_worker", worker = %worker_type);
            join_set.spawn(worker.run().instrument(span));
        }

        PublisherPoolHandle { join_set }
    }
}

struct PublisherWorker<T, K> {
    sink: K,
    batch_rx: SharedBatchReceiver<T>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T, K> PublisherWorker<T, K>
where
    T: Send + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    async fn run(self) -> EngineResult<()> {
        debug!("starting publisher worker");

        let mut published = 0u64;
        let mut failed = 0u64;

        loop {
            // The lock is released as soon as a batch is dequeued, so publishes run in parallel.
            let batch = self.batch_rx.lock().await.recv().await;
            let Some(batch) = batch else {
                break;
            };

            let batch_size = batch.len();
            let started_at = Instant::now();

            match self.sink.publish_batch(batch).await {
                Ok(()) => {
                    published += 1;
                    counter!(SENSOR_BATCHES_PUBLISHED_TOTAL, SINK_LABEL => K::name()).increment(1);
                    counter!(SENSOR_ENVELOPES_PUBLISHED_TOTAL, SINK_LABEL => K::name())
                        .increment(batch_size as u64);
                }
                Err(err) => {
                    failed += 1;
                    error!(batch_size, error = %err, "failed to publish batch, dropping it");
                    counter!(SENSOR_PUBLISH_FAILURES_TOTAL, SINK_LABEL => K::name()).increment(1);
                }
            }

            histogram!(SENSOR_PUBLISH_DURATION_SECONDS, SINK_LABEL => K::name())
                .record(started_at.elapsed().as_secs_f64());
        }

        debug!(published, failed, "publisher worker stopped");

        Ok(())
    }
}
