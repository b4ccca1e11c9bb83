//! Sample ingestion
//!
//! One request runs: classify → store reading → (maybe) assess → respond.
//! The reading is committed before any AI call, and a failed or skipped
//! assessment never fails the request.

use crate::advisor::{build_prompt, Advisor};
use crate::alerts::Alert;
use crate::error::AppResult;
use crate::state::AppState;
use crate::storage::{NewAnalysis, Reading};
use chrono::Utc;
use policy::classify::check_finite;
use policy::wire::{AnalysisPayload, IngestResponse, SensorInput};
use policy::{classify, recommendations_or_fallback, Severity};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

pub async fn ingest(state: &AppState, input: SensorInput) -> AppResult<IngestResponse> {
    check_finite(input.tds, input.temperature)?;

    let mut classification = classify(&state.thresholds, input.tds, input.temperature);
    let should_trigger = classification.should_trigger();
    let should_call_ai = state.gate.should_call_ai(input.tds);

    let reading = state.db.insert_reading(
        Utc::now(),
        input.tds,
        input.temperature,
        classification.is_safe(),
        should_trigger,
    )?;

    info!(
        "Reading #{}: TDS={} ppm, Temp={}°C, Status={}",
        reading.id, reading.tds, reading.temperature, classification.severity
    );

    if !reading.is_safe {
        dispatch_alert(state, &reading);
    }

    let advisor = state.advisor.as_ref().filter(|_| should_call_ai);
    let analysis = match advisor {
        Some(advisor) => {
            info!("AI analysis triggered (TDS > {} ppm)", state.gate.tds_cutoff);
            state
                .gate
                .ensure_issues(input.tds, &mut classification.issues);
            request_analysis(
                state,
                &**advisor,
                &reading,
                classification.severity,
                &classification.issues,
            )
            .await
        }
        None => {
            info!(
                "AI not triggered (TDS <= {} ppm or API key missing)",
                state.gate.tds_cutoff
            );
            None
        }
    };

    Ok(IngestResponse {
        id: reading.id,
        timestamp: reading.timestamp,
        tds: reading.tds,
        temperature: reading.temperature,
        is_safe: reading.is_safe,
        ai_triggered: reading.ai_triggered,
        severity: classification.severity,
        issues: classification.issues,
        analysis,
    })
}

/// Ask for an assessment and store it. Any failure is logged and yields `None`.
async fn request_analysis(
    state: &AppState,
    advisor: &dyn Advisor,
    reading: &Reading,
    severity: Severity,
    issues: &[String],
) -> Option<AnalysisPayload> {
    let prompt = build_prompt(reading.tds, reading.temperature, severity, issues);

    let start = Instant::now();
    let text = match advisor.assess(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            error!("AI error for reading #{}: {}", reading.id, e);
            return None;
        }
    };
    let response_ms = start.elapsed().as_millis() as i64;

    let mut recommendations = recommendations_or_fallback(&text);
    recommendations.truncate(policy::constants::MAX_RECOMMENDATIONS);

    let new = NewAnalysis {
        reading_id: reading.id,
        analysis: text,
        status: severity,
        recommendations,
        response_ms,
    };

    match state.db.insert_analysis(Utc::now(), &new) {
        Ok(stored) => {
            info!("AI analysis completed ({}ms)", response_ms);
            Some(AnalysisPayload {
                analysis: stored.analysis,
                status: stored.status,
                recommendations: stored.recommendations,
                response_ms: stored.response_ms,
            })
        }
        Err(e) => {
            error!("Failed to store analysis for reading #{}: {:#}", reading.id, e);
            None
        }
    }
}

/// Send the unsafe-reading alert off the request path.
fn dispatch_alert(state: &AppState, reading: &Reading) {
    let sink = Arc::clone(&state.alerts);
    let alert = Alert::unsafe_reading(reading.tds, reading.temperature);
    let id = reading.id;

    tokio::spawn(async move {
        if let Err(e) = sink.send(&alert).await {
            warn!("Failed to send alert for reading #{}: {:#}", id, e);
        }
    });
}
