//! Tasks running the engine stages.
//!
//! The [`generator`] produces envelopes, the [`batcher`] groups them and the [`publisher`]
//! pool hands batches to the sink. Each one runs in its own tokio task and is awaited through
//! a [`base::WorkerHandle`].

pub mod base;
pub mod batcher;
pub mod generator;
pub mod publisher;
