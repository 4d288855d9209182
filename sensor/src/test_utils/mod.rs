//! Utilities for testing the engine and its stages.
//!
//! The sinks in this module wrap another [`Sink`](crate::sink::Sink) and add observability
//! or failure injection on top of it:
//!
//! - [`test_sink_wrapper`] records every call and lets tests wait for a number of batches.
//! - [`faulty_sink`] fails chosen publishes or the final close.
//! - [`gated_sink`] blocks publishes until the test opens the gate, simulating a slow sink.
//!
//! [`counting_seeder`] provides a deterministic seeder that can trigger shutdown after a
//! given number of draws, and [`notify`] wraps [`tokio::sync::Notify`] with a timeout so
//! that tests fail instead of hanging.
pub mod counting_seeder;
pub mod faulty_sink;
pub mod gated_sink;
pub mod notify;
pub mod test_sink_wrapper;
