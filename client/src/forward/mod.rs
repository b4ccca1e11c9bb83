//! Forward samples to the server

use anyhow::{Context, Result};
use policy::SensorInput;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ServerConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted { id: i64, is_safe: bool },
    Rejected { status: u16, body: String },
}

/// The part of the ingest response the reader cares about
#[derive(Debug, Deserialize)]
struct Ack {
    id: i64,
    is_safe: bool,
}

pub struct Forwarder {
    client: reqwest::blocking::Client,
    url: String,
}

impl Forwarder {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.ingest_url(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one sample. Transport failures are errors; HTTP errors are an outcome.
    pub fn send(&self, sample: &SensorInput) -> Result<Outcome> {
        let response = self
            .client
            .post(&self.url)
            .json(sample)
            .send()
            .with_context(|| format!("Failed to reach {}", self.url))?;

        let status = response.status();
        let body = response.text().context("Failed to read server response")?;
        interpret(status, &body)
    }
}

fn interpret(status: StatusCode, body: &str) -> Result<Outcome> {
    if status != StatusCode::OK {
        return Ok(Outcome::Rejected {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }

    let ack: Ack = serde_json::from_str(body).context("Unexpected server response")?;
    Ok(Outcome::Accepted {
        id: ack.id,
        is_safe: ack.is_safe,
    })
}

/// Send and log; never fails so the read loop keeps going.
pub fn forward_and_log(forwarder: &Forwarder, sample: &SensorInput) {
    match forwarder.send(sample) {
        Ok(Outcome::Accepted { id, is_safe }) => {
            info!("Reading #{} | Safe: {}", id, is_safe);
        }
        Ok(Outcome::Rejected { status, body }) => {
            warn!("Server returned {}: {}", status, body);
        }
        Err(e) => {
            warn!("{:#}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_response() {
        let body = r#"{"id": 42, "timestamp": "2026-01-01T00:00:00Z", "TDS": 300.0,
            "temperature": 22.0, "is_safe": true, "ai_triggered": false,
            "severity": "safe", "issues": [], "analysis": null}"#;
        assert_eq!(
            interpret(StatusCode::OK, body).unwrap(),
            Outcome::Accepted { id: 42, is_safe: true }
        );
    }

    #[test]
    fn test_rejected_response_keeps_body() {
        let body = r#"{"error": "TDS must be a finite number", "code": "VALIDATION_ERROR"}"#;
        assert_eq!(
            interpret(StatusCode::UNPROCESSABLE_ENTITY, body).unwrap(),
            Outcome::Rejected {
                status: 422,
                body: body.to_string()
            }
        );
    }

    #[test]
    fn test_garbled_success_is_an_error() {
        assert!(interpret(StatusCode::OK, "<html>proxy</html>").is_err());
    }

    #[test]
    fn test_unreachable_server_is_an_error() {
        let forwarder = Forwarder::new(&ServerConfig {
            url: "http://127.0.0.1:1".to_string(),
            timeout_sec: 1,
        })
        .unwrap();
        assert_eq!(forwarder.url(), "http://127.0.0.1:1/sensor_data");

        let sample = SensorInput {
            tds: 300.0,
            temperature: 22.0,
        };
        assert!(forwarder.send(&sample).is_err());
        forward_and_log(&forwarder, &sample);
    }
}
