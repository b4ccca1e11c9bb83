//! HTTP handlers for the ingestion and query API

pub mod analyses;
pub mod readings;
pub mod service;
pub mod stats;

use crate::middleware;
use crate::state::SharedState;
use axum::routing::{delete, get, post};
use axum::Router;

pub use analyses::{clear_data, recent_analyses};
pub use readings::{history, latest, receive_data};
pub use service::{health, root, thresholds};
pub use stats::stats;

/// Build the API router
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/sensor_data", post(receive_data))
        .route("/readings/latest", get(latest))
        .route("/readings/history", get(history))
        .route("/stats", get(stats))
        .route("/thresholds", get(thresholds))
        .route("/analyses/recent", get(recent_analyses))
        .route("/data/clear", delete(clear_data))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(axum::middleware::from_fn(middleware::cors))
        .with_state(state)
}

/// `hours` query parameter shared by history and stats
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub struct WindowQuery {
    pub hours: Option<i64>,
}

pub const DEFAULT_WINDOW_HOURS: i64 = 24;

/// Ten years
pub const MAX_WINDOW_HOURS: i64 = 24 * 365 * 10;

impl WindowQuery {
    pub fn hours(&self) -> Result<i64, crate::error::AppError> {
        let hours = self.hours.unwrap_or(DEFAULT_WINDOW_HOURS);
        if !(1..=MAX_WINDOW_HOURS).contains(&hours) {
            return Err(crate::error::AppError::Validation(format!(
                "hours must be between 1 and {}, got {}",
                MAX_WINDOW_HOURS, hours
            )));
        }
        Ok(hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{state_with, RecordingSink};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::response::Response;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        let (sink, _rx) = RecordingSink::new();
        router(state_with(None, sink))
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/sensor_data")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn assert_validation_error(request: Request<Body>) {
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_bad_samples_are_rejected() {
        assert_validation_error(post_json(r#"{"TDS": 300}"#)).await;
        assert_validation_error(post_json(r#"{"TDS": "high", "temperature": 22}"#)).await;
        assert_validation_error(post_json("not json")).await;

        let no_content_type = Request::builder()
            .method(Method::POST)
            .uri("/sensor_data")
            .body(Body::from(r#"{"TDS": 300, "temperature": 22}"#))
            .unwrap();
        assert_validation_error(no_content_type).await;
    }

    #[tokio::test]
    async fn test_bad_query_parameters_are_rejected() {
        assert_validation_error(get("/readings/history?hours=abc")).await;
        assert_validation_error(get("/stats?hours=0")).await;
        assert_validation_error(get("/analyses/recent?limit=-1")).await;
    }

    #[tokio::test]
    async fn test_valid_sample_round_trip() {
        let app = app();

        let response = app
            .clone()
            .oneshot(post_json(r#"{"TDS": 1100, "temperature": 22}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let posted = json_body(response).await;
        assert_eq!(posted["severity"], "warning");
        assert_eq!(posted["is_safe"], false);
        assert!(posted["analysis"].is_null());

        let response = app.oneshot(get("/readings/latest")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let latest = json_body(response).await;
        assert_eq!(latest["id"], posted["id"]);
        assert_eq!(latest["TDS"], 1100.0);
    }

    #[tokio::test]
    async fn test_empty_store_latest_is_not_found() {
        let response = app().oneshot(get("/readings/latest")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_preflight_and_cors_headers() {
        let preflight = Request::builder()
            .method(Method::OPTIONS)
            .uri("/data/clear")
            .header(header::ORIGIN, "http://localhost:8080")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
            .body(Body::empty())
            .unwrap();
        let response = app().oneshot(preflight).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS]
                .to_str()
                .unwrap()
                .contains("DELETE")
        );

        let response = app().oneshot(get("/thresholds")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
