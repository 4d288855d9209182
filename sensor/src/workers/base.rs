use std::fmt;
use std::future::Future;

use crate::error::EngineResult;

/// Classification of engine workers, used in logs and errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    /// Produces envelopes at a fixed interval.
    Generator,
    /// Groups envelopes into batches.
    Batcher,
    /// Forwards batches to the sink.
    Publisher {
        /// Index of the worker within the pool.
        id: usize,
    },
}

impl fmt::Display for WorkerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerType::Generator => f.write_str("generator"),
            WorkerType::Batcher => f.write_str("batcher"),
            WorkerType::Publisher { id } => write!(f, "publisher-{id}"),
        }
    }
}

/// Handle to a running worker.
pub trait WorkerHandle {
    /// Waits for the worker to complete and returns its result.
    ///
    /// A panic inside the worker is returned as an error of the matching panic kind.
    fn wait(self) -> impl Future<Output = EngineResult<()>> + Send;
}
