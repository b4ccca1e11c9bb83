//! Static dashboard listener
//!
//! Serves one HTML page at `/` on its own port. The page talks to the API
//! from the browser; nothing here touches the database.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

const BUILTIN_DASHBOARD: &str = include_str!("../assets/dashboard.html");

pub struct DashboardSource {
    html_path: Option<PathBuf>,
}

impl DashboardSource {
    pub fn new(html_path: Option<PathBuf>) -> Self {
        Self { html_path }
    }

    /// Read the page fresh on every request so edits show up without a restart.
    pub async fn load(&self) -> Result<String> {
        match &self.html_path {
            Some(path) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read dashboard file {:?}", path)),
            None => Ok(BUILTIN_DASHBOARD.to_string()),
        }
    }
}

pub fn router(source: DashboardSource) -> Router {
    Router::new()
        .route("/", get(serve_dashboard))
        .with_state(Arc::new(source))
}

async fn serve_dashboard(State(source): State<Arc<DashboardSource>>) -> Response {
    match source.load().await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("{:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Dashboard unavailable").into_response()
        }
    }
}
