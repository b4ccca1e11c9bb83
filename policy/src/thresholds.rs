//! Cooling-water threshold table
//!
//! Defaults follow ASHRAE guidance for data center cooling loops. The table
//! is a plain value: the server loads it from configuration and hands it to
//! [`crate::classify`], nothing here reads ambient state.

use crate::error::PolicyError;
use serde::{Deserialize, Serialize};

/// Total dissolved solids bounds (ppm)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TdsThresholds {
    /// Below this the water is corrosive
    pub optimal_min: f64,
    /// Upper end of the ideal range
    pub optimal_max: f64,
    /// Scale formation begins
    pub warning_max: f64,
    /// Severe scaling / system damage
    pub critical_max: f64,
}

/// Loop temperature bounds (°C)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureThresholds {
    pub optimal_min: f64,
    pub optimal_max: f64,
    pub warning_min: f64,
    pub warning_max: f64,
    pub critical_min: f64,
    pub critical_max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    #[serde(rename = "TDS", alias = "tds")]
    pub tds: TdsThresholds,
    pub temperature: TemperatureThresholds,
}

impl Default for TdsThresholds {
    fn default() -> Self {
        Self {
            optimal_min: 60.0,
            optimal_max: 500.0,
            warning_max: 1200.0,
            critical_max: 1500.0,
        }
    }
}

impl Default for TemperatureThresholds {
    fn default() -> Self {
        Self {
            optimal_min: 18.0,
            optimal_max: 27.0,
            warning_min: 15.0,
            warning_max: 32.0,
            critical_min: 10.0,
            critical_max: 35.0,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            tds: TdsThresholds::default(),
            temperature: TemperatureThresholds::default(),
        }
    }
}

impl Thresholds {
    /// Check that every bound is finite and the tiers nest in order.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let tds = &self.tds;
        ascending(
            "TDS",
            &[
                ("optimal_min", tds.optimal_min),
                ("optimal_max", tds.optimal_max),
                ("warning_max", tds.warning_max),
                ("critical_max", tds.critical_max),
            ],
        )?;

        let temp = &self.temperature;
        ascending(
            "temperature",
            &[
                ("critical_min", temp.critical_min),
                ("warning_min", temp.warning_min),
                ("optimal_min", temp.optimal_min),
                ("optimal_max", temp.optimal_max),
                ("warning_max", temp.warning_max),
                ("critical_max", temp.critical_max),
            ],
        )
    }
}

fn ascending(dimension: &'static str, bounds: &[(&str, f64)]) -> Result<(), PolicyError> {
    for (name, value) in bounds {
        if !value.is_finite() {
            return Err(PolicyError::InvalidThresholds {
                dimension,
                reason: format!("{} is not finite", name),
            });
        }
    }

    for pair in bounds.windows(2) {
        let (lo_name, lo) = pair[0];
        let (hi_name, hi) = pair[1];
        if lo >= hi {
            return Err(PolicyError::InvalidThresholds {
                dimension,
                reason: format!("{} ({}) must be below {} ({})", lo_name, lo, hi_name, hi),
            });
        }
    }

    Ok(())
}
