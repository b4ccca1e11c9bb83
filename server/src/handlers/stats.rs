//! Aggregate statistics over a time window
//!
//! The savings figures are a flat estimate: every AI analysis is assumed to
//! prevent a fixed number of downtime hours at a fixed hourly cost.

use super::WindowQuery;
use crate::config::StatsConfig;
use crate::error::AppResult;
use crate::state::SharedState;
use crate::storage::WindowCounts;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub period_hours: i64,
    pub total_readings: i64,
    pub anomalies_detected: i64,
    pub ai_analyses: i64,
    pub api_call_savings_vs_total_alerts: String,
    pub readings_per_hour: f64,
    pub estimated_downtime_prevented_hours: f64,
    pub estimated_cost_savings_usd: String,
}

impl Stats {
    pub fn compute(hours: i64, counts: WindowCounts, config: &StatsConfig) -> Self {
        let total = counts.total_readings;
        let analyses = counts.analyses;

        let savings = if total > 0 {
            format!("{:.1}%", (total - analyses) as f64 / total as f64 * 100.0)
        } else {
            "0%".to_string()
        };

        let readings_per_hour = if hours > 0 {
            round_to(total as f64 / hours as f64, 1)
        } else {
            0.0
        };

        let downtime_hours = analyses as f64 * config.downtime_hours_per_analysis;
        let cost_saved = downtime_hours * config.downtime_cost_per_hour;

        Self {
            period_hours: hours,
            total_readings: total,
            anomalies_detected: counts.anomalies,
            ai_analyses: analyses,
            api_call_savings_vs_total_alerts: savings,
            readings_per_hour,
            estimated_downtime_prevented_hours: round_to(downtime_hours, 2),
            estimated_cost_savings_usd: format_usd(cost_saved),
        }
    }
}

/// GET /stats?hours=N
pub async fn stats(
    State(state): State<SharedState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> AppResult<Json<Stats>> {
    let Query(query) = query?;
    let hours = query.hours()?;

    let counts = state.db.window_counts(Utc::now() - Duration::hours(hours))?;
    Ok(Json(Stats::compute(hours, counts, &state.stats)))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Whole dollars with thousands separators, e.g. `$1,620,000`
fn format_usd(amount: f64) -> String {
    let whole = amount.round().max(0.0) as u64;
    let digits = whole.to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("${}", grouped)
}
