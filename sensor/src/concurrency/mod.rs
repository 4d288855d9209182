//! Concurrency primitives coordinating the engine stages.
//!
//! The [`shutdown`] module implements the broadcast cancellation every stage observes at its
//! suspension points. Stages never get interrupted: each one reacts to the signal at the next
//! point where it would otherwise block.

pub mod shutdown;
