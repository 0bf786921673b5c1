//! Propagation environments.
//!
//! The same factor stretches the atmospheric loss and the handover
//! elevation thresholds: obstructed or wet environments need the UE to
//! start preparing earlier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::LinkBudgetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Open,
    Urban,
    Mountain,
    HeavyRain,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Open,
        Environment::Urban,
        Environment::Mountain,
        Environment::HeavyRain,
    ];

    /// Multiplier for pre-handover and execution thresholds
    pub fn threshold_factor(&self) -> f64 {
        match self {
            Environment::Open => 1.0,
            Environment::Urban => 1.1,
            Environment::Mountain => 1.3,
            Environment::HeavyRain => 1.4,
        }
    }

    /// Multiplier for atmospheric loss
    pub fn atmospheric_factor(&self) -> f64 {
        self.threshold_factor()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Open => "open",
            Environment::Urban => "urban",
            Environment::Mountain => "mountain",
            Environment::HeavyRain => "heavy_rain",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = LinkBudgetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(Environment::Open),
            "urban" => Ok(Environment::Urban),
            "mountain" => Ok(Environment::Mountain),
            "heavy_rain" | "heavy-rain" => Ok(Environment::HeavyRain),
            other => Err(LinkBudgetError::UnknownEnvironment(other.to_string())),
        }
    }
}
