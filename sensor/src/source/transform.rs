use chrono::{DateTime, Utc};

/// Maps a seeded scalar and its capture time to an envelope payload.
///
/// Implemented for every `Fn(f64, DateTime<Utc>) -> T` closure.
pub trait Transform {
    type Output;

    fn transform(&self, input: f64, timestamp: DateTime<Utc>) -> Self::Output;
}

impl<F, T> Transform for F
where
    F: Fn(f64, DateTime<Utc>) -> T,
{
    type Output = T;

    fn transform(&self, input: f64, timestamp: DateTime<Utc>) -> T {
        self(input, timestamp)
    }
}
