//! Recent AI analyses and the bulk clear

use crate::error::{AppError, AppResult};
use crate::state::SharedState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use policy::Severity;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub reading_id: i64,
    pub status: Severity,
    pub analysis: String,
    pub recommendations: Vec<String>,
    pub response_ms: i64,
}

#[derive(Debug, Serialize)]
pub struct RecentAnalyses {
    pub count: usize,
    pub analyses: Vec<AnalysisEntry>,
}

/// GET /analyses/recent?limit=N
pub async fn recent_analyses(
    State(state): State<SharedState>,
    query: Result<Query<LimitQuery>, QueryRejection>,
) -> AppResult<Json<RecentAnalyses>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}, got {}",
            MAX_LIMIT, limit
        )));
    }

    let analyses: Vec<AnalysisEntry> = state
        .db
        .recent_analyses(limit)?
        .into_iter()
        .map(|a| AnalysisEntry {
            id: a.id,
            timestamp: a.timestamp,
            reading_id: a.reading_id,
            status: a.status,
            analysis: a.analysis,
            recommendations: a.recommendations,
            response_ms: a.response_ms,
        })
        .collect();

    Ok(Json(RecentAnalyses {
        count: analyses.len(),
        analyses,
    }))
}

/// DELETE /data/clear
pub async fn clear_data(State(state): State<SharedState>) -> AppResult<Json<serde_json::Value>> {
    let (readings, analyses) = state.db.clear_all()?;
    info!("Cleared all data ({} readings, {} analyses)", readings, analyses);
    Ok(Json(json!({ "message": "All data cleared" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::readings::history;
    use crate::handlers::WindowQuery;
    use crate::storage::NewAnalysis;
    use crate::state::testing::{state_with, RecordingSink};

    fn limit(limit: Option<u32>) -> Result<Query<LimitQuery>, QueryRejection> {
        Ok(Query(LimitQuery { limit }))
    }

    #[tokio::test]
    async fn test_recent_analyses_listing() {
        let (sink, _rx) = RecordingSink::new();
        let state = state_with(None, sink);

        for tds in [1100.0, 1200.0, 1300.0] {
            let reading = state.db.insert_reading(Utc::now(), tds, 22.0, false, true).unwrap();
            state
                .db
                .insert_analysis(
                    Utc::now(),
                    &NewAnalysis {
                        reading_id: reading.id,
                        analysis: format!("TDS at {}", tds),
                        status: Severity::Warning,
                        recommendations: vec!["Flush filter".to_string()],
                        response_ms: 100,
                    },
                )
                .unwrap();
        }

        let Json(all) = recent_analyses(State(state.clone()), limit(None)).await.unwrap();
        assert_eq!(all.count, 3);
        assert_eq!(all.analyses[0].analysis, "TDS at 1300");

        let Json(two) = recent_analyses(State(state), limit(Some(2))).await.unwrap();
        assert_eq!(two.count, 2);
    }

    #[tokio::test]
    async fn test_limit_bounds() {
        let (sink, _rx) = RecordingSink::new();
        let state = state_with(None, sink);
        assert!(recent_analyses(State(state.clone()), limit(Some(0))).await.is_err());
        assert!(recent_analyses(State(state), limit(Some(5000))).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_then_history_is_empty() {
        let (sink, _rx) = RecordingSink::new();
        let state = state_with(None, sink);
        state.db.insert_reading(Utc::now(), 300.0, 22.0, true, false).unwrap();
        state.db.insert_reading(Utc::now(), 1600.0, 22.0, false, true).unwrap();

        let Json(message) = clear_data(State(state.clone())).await.unwrap();
        assert_eq!(message["message"], "All data cleared");

        for hours in [1, 24, 24 * 365] {
            let Json(h) = history(State(state.clone()), Ok(Query(WindowQuery { hours: Some(hours) })))
                .await
                .unwrap();
            assert_eq!(h.count, 0);
            assert!(h.data.is_empty());
        }
    }
}
