use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::concurrency::shutdown::ShutdownTx;
use crate::source::Seeder;

/// Shared view over the number of values a [`CountingSeeder`] produced.
#[derive(Debug, Clone, Default)]
pub struct DrawCounter(Arc<AtomicU64>);

impl DrawCounter {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Seeder yielding `1.0, 2.0, 3.0, ...`, i.e. the draw number of each value.
///
/// It can signal shutdown from inside a draw, which makes the point at which the generator
/// observes the signal deterministic.
#[derive(Debug, Default)]
pub struct CountingSeeder {
    draws: DrawCounter,
    shutdown_on: Option<(u64, ShutdownTx)>,
}

impl CountingSeeder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals `shutdown_tx` while producing the `draw`-th value (1-based).
    pub fn shutdown_on_draw(mut self, draw: u64, shutdown_tx: ShutdownTx) -> Self {
        self.shutdown_on = Some((draw, shutdown_tx));
        self
    }

    pub fn draws(&self) -> DrawCounter {
        self.draws.clone()
    }
}

impl Seeder for CountingSeeder {
    fn generate(&mut self) -> f64 {
        let draw = self.draws.0.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((trigger, shutdown_tx)) = &self.shutdown_on {
            if draw == *trigger {
                shutdown_tx.shutdown();
            }
        }

        draw as f64
    }
}
