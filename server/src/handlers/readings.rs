//! Sample ingestion and reading queries

use super::WindowQuery;
use crate::error::{AppError, AppResult};
use crate::ingest::ingest;
use crate::state::SharedState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use policy::wire::{IngestResponse, SensorInput};
use policy::Severity;
use serde::Serialize;

/// POST /sensor_data
pub async fn receive_data(
    State(state): State<SharedState>,
    payload: Result<Json<SensorInput>, JsonRejection>,
) -> AppResult<Json<IngestResponse>> {
    let Json(input) = payload?;
    let response = ingest(&state, input).await?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct LatestAnalysis {
    pub analysis: String,
    pub status: Severity,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LatestReading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "TDS")]
    pub tds: f64,
    pub temperature: f64,
    pub is_safe: bool,
    pub ai_triggered: bool,
    pub analysis: Option<LatestAnalysis>,
}

/// GET /readings/latest
pub async fn latest(State(state): State<SharedState>) -> AppResult<Json<LatestReading>> {
    let reading = state
        .db
        .latest_reading()?
        .ok_or_else(|| AppError::NotFound("No readings yet".to_string()))?;

    let analysis = state
        .db
        .analysis_for_reading(reading.id)?
        .map(|a| LatestAnalysis {
            analysis: a.analysis,
            status: a.status,
            recommendations: a.recommendations,
        });

    Ok(Json(LatestReading {
        id: reading.id,
        timestamp: reading.timestamp,
        tds: reading.tds,
        temperature: reading.temperature,
        is_safe: reading.is_safe,
        ai_triggered: reading.ai_triggered,
        analysis,
    }))
}

#[derive(Debug, Serialize)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "TDS")]
    pub tds: f64,
    pub temperature: f64,
    pub is_safe: bool,
}

#[derive(Debug, Serialize)]
pub struct History {
    pub count: usize,
    pub hours: i64,
    pub data: Vec<HistoryPoint>,
}

/// GET /readings/history?hours=N
pub async fn history(
    State(state): State<SharedState>,
    query: Result<Query<WindowQuery>, QueryRejection>,
) -> AppResult<Json<History>> {
    let Query(query) = query?;
    let hours = query.hours()?;

    let since = Utc::now() - Duration::hours(hours);
    let data: Vec<HistoryPoint> = state
        .db
        .readings_since(since)?
        .into_iter()
        .map(|r| HistoryPoint {
            timestamp: r.timestamp,
            tds: r.tds,
            temperature: r.temperature,
            is_safe: r.is_safe,
        })
        .collect();

    Ok(Json(History {
        count: data.len(),
        hours,
        data,
    }))
}
