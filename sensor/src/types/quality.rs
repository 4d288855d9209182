use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bail;
use crate::error::{EngineResult, ErrorKind};

/// Coarse reliability classification attached to each envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Ok,
    Noisy,
    Partial,
    Corrupt,
}

impl Quality {
    /// Returns the wire name of the quality tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Ok => "OK",
            Quality::Noisy => "NOISY",
            Quality::Partial => "PARTIAL",
            Quality::Corrupt => "CORRUPT",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cumulative thresholds mapping a uniform draw in `[0, 1)` to a [`Quality`].
///
/// A draw below `corrupt` is [`Quality::Corrupt`], below `partial` is [`Quality::Partial`],
/// below `noisy` is [`Quality::Noisy`] and anything else is [`Quality::Ok`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityDistribution {
    corrupt: f64,
    partial: f64,
    noisy: f64,
}

impl QualityDistribution {
    /// Default cumulative threshold for [`Quality::Corrupt`] (1%).
    pub const DEFAULT_CORRUPT: f64 = 0.01;

    /// Default cumulative threshold for [`Quality::Partial`] (next 2%).
    pub const DEFAULT_PARTIAL: f64 = 0.03;

    /// Default cumulative threshold for [`Quality::Noisy`] (next 5%).
    pub const DEFAULT_NOISY: f64 = 0.08;

    /// Creates a distribution from cumulative thresholds.
    ///
    /// Thresholds must satisfy `0 <= corrupt <= partial <= noisy <= 1`.
    pub fn new(corrupt: f64, partial: f64, noisy: f64) -> EngineResult<Self> {
        let ordered = 0.0 <= corrupt && corrupt <= partial && partial <= noisy && noisy <= 1.0;
        if !ordered {
            bail!(
                ErrorKind::ValidationError,
                "Invalid quality distribution",
                format!(
                    "thresholds must satisfy 0 <= corrupt <= partial <= noisy <= 1, got {corrupt}, {partial}, {noisy}"
                )
            );
        }

        Ok(Self {
            corrupt,
            partial,
            noisy,
        })
    }

    /// Classifies a uniform draw in `[0, 1)`.
    pub fn classify(&self, draw: f64) -> Quality {
        if draw < self.corrupt {
            Quality::Corrupt
        } else if draw < self.partial {
            Quality::Partial
        } else if draw < self.noisy {
            Quality::Noisy
        } else {
            Quality::Ok
        }
    }
}

impl Default for QualityDistribution {
    fn default() -> Self {
        Self {
            corrupt: Self::DEFAULT_CORRUPT,
            partial: Self::DEFAULT_PARTIAL,
            noisy: Self::DEFAULT_NOISY,
        }
    }
}
