use std::fmt;
use std::sync::Arc;

use tokio::sync::{Mutex, Notify};

use crate::error::EngineResult;
use crate::sink::Sink;
use crate::test_utils::notify::TimedNotify;
use crate::types::{Batch, Envelope};

type BatchCondition<T> = Box<dyn Fn(&[Batch<T>]) -> bool + Send + Sync>;

/// A call received by a [`TestSinkWrapper`], recorded when it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkCall {
    PublishOne,
    PublishBatch { size: usize },
    Close,
}

struct Inner<T> {
    calls: Vec<SinkCall>,
    envelopes: Vec<Envelope<T>>,
    batches: Vec<Batch<T>>,
    batch_conditions: Vec<(BatchCondition<T>, Arc<Notify>)>,
    in_flight_publishes: usize,
    closed_while_publishing: bool,
    close_calls: usize,
}

impl<T> Inner<T> {
    fn check_conditions(&mut self) {
        let batches = &self.batches;
        self.batch_conditions.retain(|(condition, notify)| {
            let should_retain = !condition(batches);
            if !should_retain {
                notify.notify_one();
            }
            should_retain
        });
    }
}

/// Test wrapper for [`Sink`] implementations that tracks every call.
///
/// Besides recording the data flowing through, it detects a close overlapping a publish
/// and lets tests wait until the published batches satisfy a condition.
pub struct TestSinkWrapper<K, T> {
    wrapped_sink: K,
    inner: Arc<Mutex<Inner<T>>>,
}

impl<K: Clone, T> Clone for TestSinkWrapper<K, T> {
    fn clone(&self) -> Self {
        Self {
            wrapped_sink: self.wrapped_sink.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<K: fmt::Debug, T> fmt::Debug for TestSinkWrapper<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestSinkWrapper")
            .field("wrapped_sink", &self.wrapped_sink)
            .finish_non_exhaustive()
    }
}

impl<K, T> TestSinkWrapper<K, T> {
    /// Wraps `sink`, starting with an empty call log.
    pub fn wrap(sink: K) -> Self {
        let inner = Inner {
            calls: Vec::new(),
            envelopes: Vec::new(),
            batches: Vec::new(),
            batch_conditions: Vec::new(),
            in_flight_publishes: 0,
            closed_while_publishing: false,
            close_calls: 0,
        };

        Self {
            wrapped_sink: sink,
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn wrapped_sink(&self) -> &K {
        &self.wrapped_sink
    }

    pub async fn calls(&self) -> Vec<SinkCall> {
        self.inner.lock().await.calls.clone()
    }

    pub async fn close_calls(&self) -> usize {
        self.inner.lock().await.close_calls
    }

    /// Returns `true` if close started while a publish had not returned yet.
    pub async fn closed_while_publishing(&self) -> bool {
        self.inner.lock().await.closed_while_publishing
    }

    pub async fn last_call_is_close(&self) -> bool {
        self.inner.lock().await.calls.last() == Some(&SinkCall::Close)
    }

    /// Registers a notification that fires once the published batches match `condition`.
    pub async fn notify_on_batches<F>(&self, condition: F) -> TimedNotify
    where
        F: Fn(&[Batch<T>]) -> bool + Send + Sync + 'static,
    {
        let notify = Arc::new(Notify::new());
        let mut inner = self.inner.lock().await;
        inner
            .batch_conditions
            .push((Box::new(condition), notify.clone()));

        // The condition may already hold.
        inner.check_conditions();

        TimedNotify::new(notify)
    }

    /// Registers a notification that fires once at least `count` envelopes were published
    /// in batches.
    pub async fn wait_for_envelopes(&self, count: usize) -> TimedNotify {
        self.notify_on_batches(move |batches| batches.iter().map(Vec::len).sum::<usize>() >= count)
            .await
    }
}

impl<K, T: Clone> TestSinkWrapper<K, T> {
    pub async fn envelopes(&self) -> Vec<Envelope<T>> {
        self.inner.lock().await.envelopes.clone()
    }

    pub async fn batches(&self) -> Vec<Batch<T>> {
        self.inner.lock().await.batches.clone()
    }
}

impl<K, T> Sink<T> for TestSinkWrapper<K, T>
where
    K: Sink<T> + Send + Sync,
    T: Clone + Send + 'static,
{
    fn name() -> &'static str {
        K::name()
    }

    async fn publish_one(&self, envelope: Envelope<T>) -> EngineResult<()> {
        self.inner.lock().await.in_flight_publishes += 1;

        let result = self.wrapped_sink.publish_one(envelope.clone()).await;

        let mut inner = self.inner.lock().await;
        inner.in_flight_publishes -= 1;
        inner.calls.push(SinkCall::PublishOne);
        if result.is_ok() {
            inner.envelopes.push(envelope);
        }

        result
    }

    async fn publish_batch(&self, batch: Batch<T>) -> EngineResult<()> {
        self.inner.lock().await.in_flight_publishes += 1;

        let size = batch.len();
        let result = self.wrapped_sink.publish_batch(batch.clone()).await;

        let mut inner = self.inner.lock().await;
        inner.in_flight_publishes -= 1;
        inner.calls.push(SinkCall::PublishBatch { size });
        if result.is_ok() {
            inner.batches.push(batch);
            inner.check_conditions();
        }

        result
    }

    async fn close(&self) -> EngineResult<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.in_flight_publishes > 0 {
                inner.closed_while_publishing = true;
            }
        }

        let result = self.wrapped_sink.close().await;

        let mut inner = self.inner.lock().await;
        inner.close_calls += 1;
        inner.calls.push(SinkCall::Close);

        result
    }
}
