//! Coolwatch Server - cooling loop water quality monitor

mod advisor;
mod alerts;
mod config;
mod dashboard;
mod error;
mod handlers;
mod ingest;
mod middleware;
mod state;
mod storage;

use advisor::{Advisor, GeminiAdvisor};
use anyhow::{Context, Result};
use clap::Parser;
use dashboard::DashboardSource;
use state::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use storage::Database;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Coolwatch server - cooling water quality monitoring", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "server.conf")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Secrets may live in a .env file next to the binary
    dotenv::dotenv().ok();

    let config = config::Config::load(&args.config).context("Failed to load configuration")?;

    let level: tracing::Level = config
        .logging
        .level
        .parse()
        .with_context(|| format!("Invalid log level '{}'", config.logging.level))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    info!("Starting Coolwatch server v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded configuration from: {}", args.config);

    let db = Database::new(&config.general.database_path)?;
    db.initialize()?;
    info!("Database: {}", config.general.database_path);

    let gate = config.ai.gate();
    let advisor: Option<Arc<dyn Advisor>> = if gate.key_configured {
        let gemini = GeminiAdvisor::new(
            &config.ai.endpoint,
            &config.ai.model,
            &config.ai.api_key,
            Duration::from_secs(config.ai.timeout_sec),
        )
        .context("Failed to create AI client")?;
        info!(
            "AI analysis enabled ({}), TDS cutoff {} ppm",
            config.ai.model, gate.tds_cutoff
        );
        Some(Arc::new(gemini))
    } else {
        warn!("No AI API key configured; readings will be stored without analysis");
        None
    };

    let alert_sink = alerts::from_config(&config.alerts)?;
    if config.alerts.enabled {
        info!("Alerts enabled via {}:{}", config.alerts.smtp_host, config.alerts.smtp_port);
    } else {
        info!("Alerts disabled; unsafe readings will only be logged");
    }

    let state = Arc::new(AppState::new(
        db,
        config.thresholds,
        gate.tds_cutoff,
        advisor,
        alert_sink,
        config.alerts.enabled,
        config.stats.clone(),
    ));

    let bind_addr = format!("{}:{}", config.general.bind_address, config.general.bind_port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    info!("API listening on {}", bind_addr);

    if config.dashboard.enabled {
        let dashboard_addr = format!("{}:{}", config.general.bind_address, config.dashboard.bind_port);
        let dashboard_listener = TcpListener::bind(&dashboard_addr)
            .await
            .with_context(|| format!("Failed to bind dashboard to {}", dashboard_addr))?;
        let source = DashboardSource::new(config.dashboard.html_path.as_ref().map(PathBuf::from));
        info!("Dashboard listening on {}", dashboard_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(dashboard_listener, dashboard::router(source)).await {
                error!("Dashboard server stopped: {}", e);
            }
        });
    }

    axum::serve(listener, handlers::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
