//! Policy constants

/// TDS above which an AI assessment may be requested (ppm)
pub const DEFAULT_AI_TDS_CUTOFF: f64 = 1000.0;

/// Maximum number of recommendations kept from one assessment
pub const MAX_RECOMMENDATIONS: usize = 3;

/// Marker that opens the recommendation section of an assessment
pub const ACTIONS_MARKER: &str = "ACTIONS:";

/// Used when an assessment carries no parseable recommendations
pub const FALLBACK_RECOMMENDATIONS: [&str; MAX_RECOMMENDATIONS] = [
    "Schedule immediate water treatment system inspection",
    "Increase monitoring frequency to every 5 minutes",
    "Contact cooling system maintenance team",
];

/// Subject line of the unsafe-reading alert
pub const ALERT_SUBJECT: &str = "Water Quality Alert!";
