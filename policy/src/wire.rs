//! JSON bodies exchanged between the device reader and the server

use crate::classify::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample as sent by the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorInput {
    #[serde(rename = "TDS")]
    pub tds: f64,
    pub temperature: f64,
}

/// AI assessment attached to a reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub analysis: String,
    pub status: Severity,
    pub recommendations: Vec<String>,
    pub response_ms: i64,
}

/// Response to a POST of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestResponse {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "TDS")]
    pub tds: f64,
    pub temperature: f64,
    pub is_safe: bool,
    pub ai_triggered: bool,
    pub severity: Severity,
    pub issues: Vec<String>,
    pub analysis: Option<AnalysisPayload>,
}
