//! AI cost-gate
//!
//! Assessments are only requested for high-TDS samples. The gate looks at
//! TDS alone: a sample that is critical purely because of temperature does
//! not pay for an AI call.

use crate::constants::DEFAULT_AI_TDS_CUTOFF;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiGate {
    /// Strict lower bound on TDS (ppm) for a call
    pub tds_cutoff: f64,
    /// Whether the advisory service has a key
    pub key_configured: bool,
}

impl AiGate {
    pub fn new(tds_cutoff: f64, key_configured: bool) -> Self {
        Self {
            tds_cutoff,
            key_configured,
        }
    }

    /// Gate with the default cutoff
    pub fn with_key(key_configured: bool) -> Self {
        Self::new(DEFAULT_AI_TDS_CUTOFF, key_configured)
    }

    pub fn should_call_ai(&self, tds: f64) -> bool {
        self.key_configured && tds > self.tds_cutoff
    }

    /// Make sure a prompt never goes out with an empty issue list.
    ///
    /// Only reachable with a custom table whose optimal_max sits above the
    /// cutoff.
    pub fn ensure_issues(&self, tds: f64, issues: &mut Vec<String>) {
        if issues.is_empty() {
            issues.push(format!(
                "TDS {} ppm - High TDS detected (>{} ppm). Immediate scale risk.",
                tds, self.tds_cutoff
            ));
        }
    }
}

impl Default for AiGate {
    fn default() -> Self {
        Self::with_key(false)
    }
}
