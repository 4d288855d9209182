//! Metrics definitions for engine monitoring.

/// Label for the quality tag of an envelope.
pub const QUALITY_LABEL: &str = "quality";

/// Label for the reason a batch was flushed.
pub const FLUSH_REASON_LABEL: &str = "flush_reason";

/// Label for the sink name.
pub const SINK_LABEL: &str = "sink";

/// Counter for envelopes handed to the batcher, labelled by quality.
pub const SENSOR_ENVELOPES_GENERATED_TOTAL: &str = "sensor_envelopes_generated_total";

/// Counter for batches emitted by the batcher, labelled by flush reason.
pub const SENSOR_BATCHES_FLUSHED_TOTAL: &str = "sensor_batches_flushed_total";

/// Histogram of emitted batch sizes.
pub const SENSOR_BATCH_SIZE: &str = "sensor_batch_size";

/// Counter for batches accepted by the sink.
pub const SENSOR_BATCHES_PUBLISHED_TOTAL: &str = "sensor_batches_published_total";

/// Counter for envelopes accepted by the sink.
pub const SENSOR_ENVELOPES_PUBLISHED_TOTAL: &str = "sensor_envelopes_published_total";

/// Counter for batches the sink rejected.
pub const SENSOR_PUBLISH_FAILURES_TOTAL: &str = "sensor_publish_failures_total";

/// Histogram of batch publish durations in seconds.
pub const SENSOR_PUBLISH_DURATION_SECONDS: &str = "sensor_publish_duration_seconds";
