//! Shared request state

use crate::advisor::Advisor;
use crate::alerts::AlertSink;
use crate::config::StatsConfig;
use crate::storage::Database;
use policy::{AiGate, Thresholds};
use std::sync::Arc;

pub struct AppState {
    pub db: Database,
    pub thresholds: Thresholds,
    pub gate: AiGate,
    /// Present only when an API key is configured
    pub advisor: Option<Arc<dyn Advisor>>,
    pub alerts: Arc<dyn AlertSink>,
    pub alerts_enabled: bool,
    pub stats: StatsConfig,
}

impl AppState {
    /// The gate's key flag follows whether an advisor was supplied.
    pub fn new(
        db: Database,
        thresholds: Thresholds,
        tds_cutoff: f64,
        advisor: Option<Arc<dyn Advisor>>,
        alerts: Arc<dyn AlertSink>,
        alerts_enabled: bool,
        stats: StatsConfig,
    ) -> Self {
        let gate = AiGate::new(tds_cutoff, advisor.is_some());
        Self {
            db,
            thresholds,
            gate,
            advisor,
            alerts,
            alerts_enabled,
            stats,
        }
    }
}

pub type SharedState = Arc<AppState>;
