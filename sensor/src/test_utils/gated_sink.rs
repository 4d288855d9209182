use std::sync::Arc;

use tokio::sync::watch;

use crate::error::EngineResult;
use crate::sink::Sink;
use crate::types::{Batch, Envelope};

/// Sink wrapper whose publishes wait until the gate is opened.
///
/// Lets tests fill the engine queues and observe backpressure. Closing never waits.
#[derive(Debug, Clone)]
pub struct GatedSink<K> {
    inner: K,
    gate: Arc<watch::Sender<bool>>,
}

impl<K> GatedSink<K> {
    /// Wraps `inner` behind a closed gate.
    pub fn new(inner: K) -> Self {
        let (gate, _) = watch::channel(false);

        Self {
            inner,
            gate: Arc::new(gate),
        }
    }

    /// Opens the gate, releasing every pending and future publish.
    pub fn open(&self) {
        self.gate.send_replace(true);
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    async fn pass(&self) {
        let mut gate = self.gate.subscribe();
        // The sender lives in `self`, so the wait cannot fail.
        let _ = gate.wait_for(|open| *open).await;
    }
}

impl<T, K> Sink<T> for GatedSink<K>
where
    T: Send + 'static,
    K: Sink<T> + Send + Sync,
{
    fn name() -> &'static str {
        "gated"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        self.pass().await;
        self.inner.publish_one(envelope).await
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        self.pass().await;
        self.inner.publish_batch(batch).await
    }

    async fn close(&self) -> EngineResult<()> {
        self.inner.close().await
    }
}
