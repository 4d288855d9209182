use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration of the numeric value source feeding the generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SeederConfig {
    /// Sine wave over wall-clock seconds: `amplitude * sin(frequency * t) + offset`.
    Time {
        #[serde(default = "default_one")]
        amplitude: f64,
        #[serde(default = "default_frequency")]
        frequency: f64,
        #[serde(default)]
        offset: f64,
    },
    /// Uniform draw in `[min, max)`.
    Random {
        #[serde(default)]
        min: f64,
        #[serde(default = "default_one")]
        max: f64,
    },
    /// Linear ramp over the seconds elapsed since the seeder was created.
    Linear {
        #[serde(default = "default_one")]
        slope: f64,
        #[serde(default)]
        offset: f64,
    },
    /// Gaussian draw.
    Normal {
        #[serde(default)]
        mean: f64,
        #[serde(default = "default_one")]
        std_dev: f64,
    },
    /// Sum of three sines over wall-clock seconds, scaled by `amplitude`.
    Harmonic {
        #[serde(default = "default_one")]
        amplitude: f64,
    },
}

impl SeederConfig {
    /// Default frequency of the time seeder.
    pub const DEFAULT_FREQUENCY: f64 = 0.1;

    /// Validates seeder parameters.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            SeederConfig::Random { min, max } if min > max => Err(ValidationError::invalid(
                "seeder.min",
                "must be less than or equal to `seeder.max`",
            )),
            SeederConfig::Normal { std_dev, .. } if !std_dev.is_finite() || *std_dev < 0.0 => {
                Err(ValidationError::invalid(
                    "seeder.std_dev",
                    "must be finite and greater than or equal to 0",
                ))
            }
            _ => Ok(()),
        }
    }
}

impl Default for SeederConfig {
    fn default() -> Self {
        SeederConfig::Time {
            amplitude: default_one(),
            frequency: default_frequency(),
            offset: 0.0,
        }
    }
}

fn default_one() -> f64 {
    1.0
}

fn default_frequency() -> f64 {
    SeederConfig::DEFAULT_FREQUENCY
}

/// Linear transform applied to every seeded value: `value * scale + offset`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TransformConfig {
    #[serde(default = "default_one")]
    pub scale: f64,
    #[serde(default)]
    pub offset: f64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            scale: default_one(),
            offset: 0.0,
        }
    }
}

/// Generator stage configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorConfig {
    /// Prefix of envelope ids, which take the form `{id_prefix}-{n}`.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    #[serde(default)]
    pub seeder: SeederConfig,
    #[serde(default)]
    pub transform: TransformConfig,
}

impl GeneratorConfig {
    /// Default envelope id prefix.
    pub const DEFAULT_ID_PREFIX: &'static str = "sensor";

    /// Validates generator configuration settings.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id_prefix.is_empty() {
            return Err(ValidationError::invalid("id_prefix", "must not be empty"));
        }

        self.seeder.validate()
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            seeder: SeederConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

fn default_id_prefix() -> String {
    GeneratorConfig::DEFAULT_ID_PREFIX.to_string()
}
