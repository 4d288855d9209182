use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bail;
use crate::error::{EngineResult, ErrorKind};
use crate::sink::Sink;
use crate::types::{Batch, Envelope};

#[derive(Debug, Default)]
struct Attempts {
    publishes: AtomicUsize,
    closes: AtomicUsize,
}

/// Sink wrapper failing chosen operations before they reach the wrapped sink.
///
/// Publishes are numbered from zero in the order the wrapper receives them, across every
/// worker and both publish methods. Clones share the attempt counters.
#[derive(Debug, Clone)]
pub struct FaultySink<K> {
    inner: K,
    failing_publishes: Arc<HashSet<usize>>,
    fail_close: bool,
    attempts: Arc<Attempts>,
}

impl<K> FaultySink<K> {
    pub fn new(inner: K) -> Self {
        Self {
            inner,
            failing_publishes: Arc::new(HashSet::new()),
            fail_close: false,
            attempts: Arc::new(Attempts::default()),
        }
    }

    /// Fails the publishes with the given attempt numbers.
    pub fn fail_publishes(mut self, attempts: impl IntoIterator<Item = usize>) -> Self {
        self.failing_publishes = Arc::new(attempts.into_iter().collect());
        self
    }

    /// Fails [`Sink::close`]. The wrapped sink is still closed.
    pub fn fail_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn publish_attempts(&self) -> usize {
        self.attempts.publishes.load(Ordering::SeqCst)
    }

    pub fn close_attempts(&self) -> usize {
        self.attempts.closes.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &K {
        &self.inner
    }

    fn next_publish_fails(&self) -> bool {
        let attempt = self.attempts.publishes.fetch_add(1, Ordering::SeqCst);
        self.failing_publishes.contains(&attempt)
    }
}

impl<T, K> Sink<T> for FaultySink<K>
where
    T: Send + 'static,
    K: Sink<T> + Send + Sync,
{
    fn name() -> &'static str {
        "faulty"
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        if self.next_publish_fails() {
            bail!(
                ErrorKind::SinkPublishFailed,
                "Injected publish failure",
                format!("envelope {} was rejected", envelope.id)
            );
        }

        self.inner.publish_one(envelope).await
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        if self.next_publish_fails() {
            bail!(
                ErrorKind::SinkPublishFailed,
                "Injected publish failure",
                format!("batch of {} envelopes was rejected", batch.len())
            );
        }

        self.inner.publish_batch(batch).await
    }

    async fn close(&self) -> EngineResult<()> {
        self.attempts.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await?;

        if self.fail_close {
            bail!(ErrorKind::SinkCloseFailed, "Injected close failure");
        }

        Ok(())
    }
}
