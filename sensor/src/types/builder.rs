use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Envelope, QualityDistribution};

/// Wraps generated values into [`Envelope`]s.
///
/// Owns the identifier sequence, so it must only ever be used by one generator.
#[derive(Debug)]
pub struct EnvelopeBuilder {
    id_prefix: String,
    next_id: u64,
    distribution: QualityDistribution,
    rng: StdRng,
}

impl EnvelopeBuilder {
    /// Default envelope id prefix.
    pub const DEFAULT_ID_PREFIX: &'static str = "sensor";

    /// Creates a builder issuing ids `{id_prefix}-0`, `{id_prefix}-1`, ...
    pub fn new(id_prefix: impl Into<String>) -> Self {
        Self {
            id_prefix: id_prefix.into(),
            next_id: 0,
            distribution: QualityDistribution::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Replaces the quality distribution.
    pub fn with_distribution(mut self, distribution: QualityDistribution) -> Self {
        self.distribution = distribution;
        self
    }

    /// Seeds the quality draws, making them reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Returns how many envelopes were built so far.
    pub fn built(&self) -> u64 {
        self.next_id
    }

    /// Builds the next envelope around `data` captured at `timestamp`.
    pub fn build<T>(&mut self, data: T, timestamp: DateTime<Utc>) -> Envelope<T> {
        let id = format!("{}-{}", self.id_prefix, self.next_id);
        self.next_id += 1;

        let quality = self.distribution.classify(self.rng.r#gen::<f64>());

        Envelope {
            id,
            timestamp,
            data,
            quality,
        }
    }
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ID_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::Quality;

    #[test]
    fn ids_are_sequential() {
        let mut builder = EnvelopeBuilder::new("temp");
        let now = Utc::now();

        let ids: Vec<String> = (0..3).map(|i| builder.build(i, now).id).collect();

        assert_eq!(ids, vec!["temp-0", "temp-1", "temp-2"]);
        assert_eq!(builder.built(), 3);
    }

    #[test]
    fn quality_frequencies_follow_default_distribution() {
        let mut builder = EnvelopeBuilder::default().with_seed(42);
        let now = Utc::now();
        let samples = 20_000;

        let mut counts: HashMap<Quality, usize> = HashMap::new();
        for _ in 0..samples {
            *counts.entry(builder.build((), now).quality).or_default() += 1;
        }

        let fraction = |quality| counts.get(&quality).copied().unwrap_or(0) as f64 / samples as f64;

        let ok = fraction(Quality::Ok);
        assert!((ok - 0.92).abs() < 0.92 * 0.05, "ok fraction was {ok}");

        let corrupt = fraction(Quality::Corrupt);
        assert!((0.005..0.015).contains(&corrupt), "corrupt fraction was {corrupt}");

        let partial = fraction(Quality::Partial);
        assert!((0.01..0.03).contains(&partial), "partial fraction was {partial}");

        let noisy = fraction(Quality::Noisy);
        assert!((0.035..0.065).contains(&noisy), "noisy fraction was {noisy}");
    }

    #[test]
    fn same_seed_yields_same_qualities() {
        let now = Utc::now();
        let mut first = EnvelopeBuilder::default().with_seed(7);
        let mut second = EnvelopeBuilder::default().with_seed(7);

        for _ in 0..100 {
            assert_eq!(first.build((), now).quality, second.build((), now).quality);
        }
    }
}
