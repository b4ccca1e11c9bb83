//! Threshold classification of a single sample
//!
//! TDS is checked first, then temperature. Within each dimension the tiers
//! are exclusive and the most severe one wins; across dimensions the
//! severity only ever escalates.

use crate::error::PolicyError;
use crate::thresholds::Thresholds;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Safe,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Safe => "safe",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    /// Raise to `other` if it is more severe; never lowers.
    pub fn escalate(&mut self, other: Severity) {
        if other > *self {
            *self = other;
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" => Ok(Severity::Safe),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            _ => Err(PolicyError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Outcome of classifying one sample
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub severity: Severity,
    pub issues: Vec<String>,
}

impl Classification {
    /// True when any threshold was crossed
    pub fn should_trigger(&self) -> bool {
        self.severity != Severity::Safe
    }

    pub fn is_safe(&self) -> bool {
        self.severity == Severity::Safe
    }

    fn flag(&mut self, severity: Severity, issue: String) {
        self.issues.push(issue);
        self.severity.escalate(severity);
    }
}

/// Classify a TDS (ppm) / temperature (°C) pair against `thresholds`.
pub fn classify(thresholds: &Thresholds, tds: f64, temperature: f64) -> Classification {
    let mut result = Classification::default();
    let t = &thresholds.tds;

    if tds < t.optimal_min {
        result.flag(
            Severity::Warning,
            format!("TDS {} ppm - TOO LOW (corrosion risk)", tds),
        );
    } else if tds > t.critical_max {
        result.flag(
            Severity::Critical,
            format!("TDS {} ppm - CRITICAL SCALE RISK (>{} ppm)", tds, t.critical_max),
        );
    } else if tds > t.warning_max {
        result.flag(
            Severity::Warning,
            format!("TDS {} ppm - SCALE FORMATION WARNING (>{} ppm)", tds, t.warning_max),
        );
    } else if tds > t.optimal_max {
        result.flag(
            Severity::Warning,
            format!("TDS {} ppm - ABOVE OPTIMAL (>{} ppm)", tds, t.optimal_max),
        );
    }

    let c = &thresholds.temperature;

    if temperature < c.critical_min || temperature > c.critical_max {
        result.flag(
            Severity::Critical,
            format!("Temperature {}°C - CRITICAL (system malfunction)", temperature),
        );
    } else if temperature < c.warning_min || temperature > c.warning_max {
        result.flag(
            Severity::Warning,
            format!("Temperature {}°C - EFFICIENCY WARNING", temperature),
        );
    } else if temperature > c.optimal_max {
        result.flag(
            Severity::Warning,
            format!("Temperature {}°C - ABOVE OPTIMAL (reduced cooling)", temperature),
        );
    }

    result
}

/// Reject samples that cannot be compared against any threshold.
pub fn check_finite(tds: f64, temperature: f64) -> Result<(), PolicyError> {
    if !tds.is_finite() {
        return Err(PolicyError::NonFinite { field: "TDS", value: tds });
    }
    if !temperature.is_finite() {
        return Err(PolicyError::NonFinite {
            field: "temperature",
            value: temperature,
        });
    }
    Ok(())
}
