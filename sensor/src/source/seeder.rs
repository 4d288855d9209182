use std::f64::consts::PI;
use std::time::Instant;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use sensor_config::shared::SeederConfig;

use crate::bail;
use crate::error::{EngineResult, ErrorKind};
use crate::sensor_error;

/// Yields the scalar behind each generated envelope.
///
/// Only the generator calls it, never concurrently.
pub trait Seeder {
    fn generate(&mut self) -> f64;
}

/// Returns the current wall-clock time in fractional unix seconds.
fn unix_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

/// Sine wave over wall-clock seconds: `amplitude * sin(frequency * t) + offset`.
#[derive(Debug, Clone)]
pub struct TimeSeeder {
    amplitude: f64,
    frequency: f64,
    offset: f64,
}

impl TimeSeeder {
    pub fn new(amplitude: f64, frequency: f64, offset: f64) -> Self {
        Self {
            amplitude,
            frequency,
            offset,
        }
    }

    /// Creates a seeder completing one cycle every `period_secs` seconds.
    pub fn with_period(amplitude: f64, period_secs: f64, offset: f64) -> Self {
        Self::new(amplitude, 2.0 * PI / period_secs, offset)
    }
}

impl Seeder for TimeSeeder {
    fn generate(&mut self) -> f64 {
        self.amplitude * (self.frequency * unix_seconds()).sin() + self.offset
    }
}

/// Uniform draw in `[min, max)`.
#[derive(Debug, Clone)]
pub struct RandomSeeder {
    min: f64,
    max: f64,
    rng: StdRng,
}

impl RandomSeeder {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeds the draws, making them reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Seeder for RandomSeeder {
    fn generate(&mut self) -> f64 {
        self.min + self.rng.r#gen::<f64>() * (self.max - self.min)
    }
}

/// Linear ramp over the seconds elapsed since creation: `slope * elapsed + offset`.
#[derive(Debug, Clone)]
pub struct LinearSeeder {
    slope: f64,
    offset: f64,
    started_at: Instant,
}

impl LinearSeeder {
    pub fn new(slope: f64, offset: f64) -> Self {
        Self {
            slope,
            offset,
            started_at: Instant::now(),
        }
    }
}

impl Seeder for LinearSeeder {
    fn generate(&mut self) -> f64 {
        self.slope * self.started_at.elapsed().as_secs_f64() + self.offset
    }
}

/// Gaussian draw with the given mean and standard deviation.
#[derive(Debug, Clone)]
pub struct NormalSeeder {
    distribution: Normal<f64>,
    rng: StdRng,
}

impl NormalSeeder {
    /// Creates the seeder, failing when `std_dev` is negative or not finite.
    pub fn new(mean: f64, std_dev: f64) -> EngineResult<Self> {
        // `Normal::new` only rejects non-finite deviations.
        if !std_dev.is_finite() || std_dev < 0.0 {
            bail!(
                ErrorKind::ValidationError,
                "Invalid normal distribution",
                format!("standard deviation {std_dev} must be finite and non-negative")
            );
        }

        let distribution = Normal::new(mean, std_dev).map_err(|err| {
            sensor_error!(
                ErrorKind::ValidationError,
                "Invalid normal distribution",
                format!("mean {mean}, standard deviation {std_dev}: {err}")
            )
        })?;

        Ok(Self {
            distribution,
            rng: StdRng::from_entropy(),
        })
    }

    /// Seeds the draws, making them reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }
}

impl Seeder for NormalSeeder {
    fn generate(&mut self) -> f64 {
        self.distribution.sample(&mut self.rng)
    }
}

/// Sum of three sines over wall-clock seconds, scaled by `amplitude`.
///
/// Produces an irregular but bounded signal in `[-0.6 * amplitude, 0.6 * amplitude]`.
#[derive(Debug, Clone)]
pub struct HarmonicSeeder {
    amplitude: f64,
}

impl HarmonicSeeder {
    pub fn new(amplitude: f64) -> Self {
        Self { amplitude }
    }

    fn value_at(&self, t: f64) -> f64 {
        self.amplitude * (0.3 * (2.0 * t).sin() + 0.2 * (7.3 * t).sin() + 0.1 * (13.7 * t).sin())
    }
}

impl Seeder for HarmonicSeeder {
    fn generate(&mut self) -> f64 {
        self.value_at(unix_seconds())
    }
}

/// Seeder backed by a user supplied closure.
pub struct CustomSeeder<F> {
    generate: F,
}

impl<F> CustomSeeder<F>
where
    F: FnMut() -> f64,
{
    pub fn new(generate: F) -> Self {
        Self { generate }
    }
}

impl<F> Seeder for CustomSeeder<F>
where
    F: FnMut() -> f64,
{
    fn generate(&mut self) -> f64 {
        (self.generate)()
    }
}

/// Seeder selected from a [`SeederConfig`].
#[derive(Debug, Clone)]
pub enum ConfiguredSeeder {
    Time(TimeSeeder),
    Random(RandomSeeder),
    Linear(LinearSeeder),
    Normal(NormalSeeder),
    Harmonic(HarmonicSeeder),
}

impl ConfiguredSeeder {
    /// Builds the seeder described by `config`.
    pub fn from_config(config: &SeederConfig) -> EngineResult<Self> {
        config.validate()?;

        let seeder = match *config {
            SeederConfig::Time {
                amplitude,
                frequency,
                offset,
            } => ConfiguredSeeder::Time(TimeSeeder::new(amplitude, frequency, offset)),
            SeederConfig::Random { min, max } => {
                ConfiguredSeeder::Random(RandomSeeder::new(min, max))
            }
            SeederConfig::Linear { slope, offset } => {
                ConfiguredSeeder::Linear(LinearSeeder::new(slope, offset))
            }
            SeederConfig::Normal { mean, std_dev } => {
                ConfiguredSeeder::Normal(NormalSeeder::new(mean, std_dev)?)
            }
            SeederConfig::Harmonic { amplitude } => {
                ConfiguredSeeder::Harmonic(HarmonicSeeder::new(amplitude))
            }
        };

        Ok(seeder)
    }
}

impl Seeder for ConfiguredSeeder {
    fn generate(&mut self) -> f64 {
        match self {
            ConfiguredSeeder::Time(seeder) => seeder.generate(),
            ConfiguredSeeder::Random(seeder) => seeder.generate(),
            ConfiguredSeeder::Linear(seeder) => seeder.generate(),
            ConfiguredSeeder::Normal(seeder) => seeder.generate(),
            ConfiguredSeeder::Harmonic(seeder) => seeder.generate(),
        }
    }
}
