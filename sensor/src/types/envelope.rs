use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::Quality;

/// A single generated, timestamped and quality-tagged record.
///
/// Envelopes are never mutated once built. Each pipeline stage takes ownership of an envelope
/// when it dequeues it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Identifier of the form `{prefix}-{n}`, unique within one generator.
    pub id: String,
    /// Capture time of the underlying value.
    pub timestamp: DateTime<Utc>,
    pub data: T,
    pub quality: Quality,
}

/// Envelopes published together, in generation order.
///
/// Batches handed to a sink are never empty.
pub type Batch<T> = Vec<Envelope<T>>;
