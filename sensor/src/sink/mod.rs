//! Sink abstractions receiving published envelopes.
//!
//! The engine only depends on the [`Sink`] trait. Concrete network and console sinks live in
//! the `sensor-sinks` crate, while [`memory::MemorySink`] keeps everything in process.

mod base;
pub mod memory;

pub use base::Sink;
