//! AI risk assessment client
//!
//! One prompt per high-TDS reading. The orchestration only sees the
//! [`Advisor`] trait; [`GeminiAdvisor`] talks to the Generative Language
//! REST API.

use async_trait::async_trait;
use policy::Severity;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum AdvisorError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Response carried no text")]
    EmptyResponse,
}

#[async_trait]
pub trait Advisor: Send + Sync {
    /// Send one prompt and return the free-text answer.
    async fn assess(&self, prompt: &str) -> Result<String, AdvisorError>;
}

/// Build the assessment prompt for one reading.
pub fn build_prompt(tds: f64, temperature: f64, severity: Severity, issues: &[String]) -> String {
    format!(
        "As a data center cooling systems expert, provide a concise analysis:

WATER QUALITY DATA:
• TDS: {tds} ppm (Optimal: 100-800 ppm)
• Temperature: {temperature}°C (Optimal: 18-27°C)
• Issues: {issues}
• Severity: {severity}

Provide a brief, professional assessment in this EXACT format:

IMPACT:
[One clear sentence about business impact - mention potential downtime cost if critical]

ROOT CAUSE:
[One sentence explaining what's causing this condition]

ACTIONS:
1. [First immediate action - be specific]
2. [Second immediate action - be specific]
3. [Third immediate action - be specific]

Keep it concise and actionable. No asterisks, no extra formatting.",
        issues = issues.join(", "),
        severity = severity.as_str().to_uppercase(),
    )
}

pub struct GeminiAdvisor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();

        if text.trim().is_empty() { None } else { Some(text) }
    }
}

impl GeminiAdvisor {
    pub fn new(endpoint: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self, AdvisorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Advisor for GeminiAdvisor {
    async fn assess(&self, prompt: &str) -> Result<String, AdvisorError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!("Requesting assessment from model {}", self.model);

        let response = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AdvisorError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.text().ok_or(AdvisorError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_reading_and_format() {
        let issues = vec![
            "TDS 1100 ppm - ABOVE OPTIMAL (>500 ppm)".to_string(),
            "Temperature 33°C - EFFICIENCY WARNING".to_string(),
        ];
        let prompt = build_prompt(1100.0, 33.0, Severity::Warning, &issues);

        assert!(prompt.contains("• TDS: 1100 ppm"));
        assert!(prompt.contains("• Temperature: 33°C"));
        assert!(prompt.contains(
            "• Issues: TDS 1100 ppm - ABOVE OPTIMAL (>500 ppm), Temperature 33°C - EFFICIENCY WARNING"
        ));
        assert!(prompt.contains("• Severity: WARNING"));
        assert!(prompt.contains("\nACTIONS:\n1."));
    }

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "IMPACT:\n"}, {"text": "ACTIONS:\n1. Flush"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.text().unwrap(), "IMPACT:\nACTIONS:\n1. Flush");
    }

    #[test]
    fn test_response_without_text_is_empty() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(parsed.text().is_none());

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"finishReason": "SAFETY"}]}"#).unwrap();
        assert!(parsed.text().is_none());

        assert!(GenerateResponse::default().text().is_none());
    }

    #[test]
    fn test_url_shape() {
        let advisor = GeminiAdvisor::new(
            "https://generativelanguage.googleapis.com/v1beta/",
            "gemini-2.5-flash",
            "k",
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            advisor.url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
