use std::future::Future;

use crate::error::EngineResult;
use crate::types::{Batch, Envelope};

/// Trait for systems that receive the envelopes produced by the engine.
///
/// A sink is shared by every publisher worker, so implementations must tolerate concurrent
/// calls to [`Sink::publish_batch`]. When more than one worker is configured, batches may
/// arrive out of generation order.
///
/// The engine calls [`Sink::close`] exactly once, after the last publish has returned.
pub trait Sink<T> {
    /// Returns the name of the sink.
    fn name() -> &'static str;

    /// Publishes a single envelope.
    ///
    /// The engine never calls it. It exists for callers wanting single-record semantics.
    fn publish_one(&self, envelope: Envelope<T>) -> impl Future<Output = EngineResult<()>> + Send;

    /// Publishes a non-empty batch of envelopes.
    ///
    /// A failure is logged by the engine and the batch is dropped: it is never retried.
    fn publish_batch(&self, batch: Batch<T>) -> impl Future<Output = EngineResult<()>> + Send;

    /// Releases the resources held by the sink.
    ///
    /// A failure here is the only error returned by [`crate::engine::Engine::start`].
    fn close(&self) -> impl Future<Output = EngineResult<()>> + Send;
}
