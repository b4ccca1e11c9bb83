//! Service banner, health and threshold table

use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use policy::Thresholds;
use serde_json::{json, Value};
use tracing::warn;

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "Coolwatch | Data Center Cooling Monitor",
        "version": env!("CARGO_PKG_VERSION"),
        "application": "Server cooling system water quality",
        "sensors": ["TDS (Conductivity)", "Temperature"],
        "compliance": "ASHRAE Standards",
        "features": ["Predictive maintenance", "Real-time alerts", "Cost-gated AI analysis"]
    }))
}

/// GET /health
pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let database = match state.db.ping() {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Health check database error: {:#}", e);
            "error"
        }
    };

    Json(json!({
        "status": "healthy",
        "database": database,
        "ai": if state.gate.key_configured { "configured" } else { "not configured" },
        "alerts": if state.alerts_enabled { "enabled" } else { "disabled" },
    }))
}

/// GET /thresholds
pub async fn thresholds(State(state): State<SharedState>) -> Json<Thresholds> {
    Json(state.thresholds)
}
