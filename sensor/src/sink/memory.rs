use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::EngineResult;
use crate::sink::Sink;
use crate::types::{Batch, Envelope};

#[derive(Debug)]
struct Inner<T> {
    envelopes: Vec<Envelope<T>>,
    batches: Vec<Batch<T>>,
    close_calls: usize,
}

/// In-memory sink for tests and local runs.
///
/// Keeps every single envelope and batch it receives. Clones share the same storage.
#[derive(Debug)]
pub struct MemorySink<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> MemorySink<T> {
    /// Creates a new empty memory sink.
    pub fn new() -> Self {
        let inner = Inner {
            envelopes: Vec::new(),
            batches: Vec::new(),
            close_calls: 0,
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    /// Returns how many times the sink was closed.
    pub async fn close_calls(&self) -> usize {
        self.inner.lock().await.close_calls
    }
}

impl<T: Clone> MemorySink<T> {
    /// Returns a copy of the envelopes published one by one.
    pub async fn envelopes(&self) -> Vec<Envelope<T>> {
        self.inner.lock().await.envelopes.clone()
    }

    /// Returns a copy of the published batches, in arrival order.
    pub async fn batches(&self) -> Vec<Batch<T>> {
        self.inner.lock().await.batches.clone()
    }

    /// Returns every envelope received through batches, in arrival order.
    pub async fn batched_envelopes(&self) -> Vec<Envelope<T>> {
        let inner = self.inner.lock().await;
        inner.batches.iter().flatten().cloned().collect()
    }
}

impl<T> Clone for MemorySink<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for MemorySink<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sink<T> for MemorySink<T>
where
    T: Send + 'static,
{
    fn name() -> &'static str {
        "memory"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.envelopes.push(envelope);

        Ok(())
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        debug!(batch_size = batch.len(), "storing batch in memory");
        inner.batches.push(batch);

        Ok(())
    }

    async fn close(&self) -> EngineResult<()> {
        let mut inner = self.inner.lock().await;
        inner.close_calls += 1;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::EnvelopeBuilder;

    #[tokio::test]
    async fn clones_share_storage() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        let mut builder = EnvelopeBuilder::new("test");
        let now = Utc::now();

        clone.publish_one(builder.build(1, now)).await.unwrap();
        clone
            .publish_batch(vec![builder.build(2, now), builder.build(3, now)])
            .await
            .unwrap();
        clone.close().await.unwrap();

        assert_eq!(sink.envelopes().await.len(), 1);
        assert_eq!(sink.batches().await.len(), 1);
        let ids: Vec<String> = sink
            .batched_envelopes()
            .await
            .into_iter()
            .map(|envelope| envelope.id)
            .collect();
        assert_eq!(ids, vec!["test-1", "test-2"]);
        assert_eq!(sink.close_calls().await, 1);
    }
}
