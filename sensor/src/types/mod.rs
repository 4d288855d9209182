mod builder;
mod envelope;
mod quality;

pub use builder::EnvelopeBuilder;
pub use envelope::{Batch, Envelope};
pub use quality::{Quality, QualityDistribution};
