//! Policy error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("Non-finite {field} value: {value}")]
    NonFinite { field: &'static str, value: f64 },

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Invalid {dimension} thresholds: {reason}")]
    InvalidThresholds {
        dimension: &'static str,
        reason: String,
    },
}
