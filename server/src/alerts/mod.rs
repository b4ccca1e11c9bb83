//! Unsafe-reading alerts
//!
//! Alerts go out as plain e-mail, normally to an email-to-SMS gateway
//! address (e.g. `1234567890@vtext.com` for Verizon, `@txt.att.net` for
//! AT&T, `@tmomail.net` for T-Mobile). Delivery failures are the caller's
//! to log; nothing here retries.

use crate::config::AlertsConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use policy::constants::ALERT_SUBJECT;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub subject: String,
    pub body: String,
}

impl Alert {
    /// Alert for a reading that failed the safety check
    pub fn unsafe_reading(tds: f64, temperature: f64) -> Self {
        Self {
            subject: ALERT_SUBJECT.to_string(),
            body: format!(
                "Unsafe reading detected:\n\n\
                TDS: {}\n\
                Temperature: {}°C\n\n\
                Please check your water system immediately.",
                tds, temperature
            ),
        }
    }
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send(&self, alert: &Alert) -> Result<()>;
}

/// Used when `[alerts] enabled = false`
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        warn!("ALERT (delivery disabled): {} | {}", alert.subject, alert.body.replace('\n', " "));
        Ok(())
    }
}

pub struct SmtpAlertSink {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpAlertSink {
    pub fn new(config: &AlertsConfig) -> Result<Self> {
        let from: Mailbox = config
            .from
            .parse()
            .with_context(|| format!("Invalid alerts.from address: {}", config.from))?;
        let to: Mailbox = config
            .to
            .parse()
            .with_context(|| format!("Invalid alerts.to address: {}", config.to))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .with_context(|| format!("Failed to set up SMTP relay {}", config.smtp_host))?
            .port(config.smtp_port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .build();

        Ok(Self { mailer, from, to })
    }

    fn message(&self, alert: &Alert) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body.clone())
            .context("Failed to build alert message")
    }
}

#[async_trait]
impl AlertSink for SmtpAlertSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        let message = self.message(alert)?;
        self.mailer
            .send(message)
            .await
            .context("Failed to send alert")?;

        info!("Alert sent to {}", self.to);
        Ok(())
    }
}

/// Pick the sink for the configuration.
pub fn from_config(config: &AlertsConfig) -> Result<Arc<dyn AlertSink>> {
    if config.enabled {
        Ok(Arc::new(SmtpAlertSink::new(config)?))
    } else {
        Ok(Arc::new(LogAlertSink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsafe_reading_alert_text() {
        let alert = Alert::unsafe_reading(1600.0, 22.5);
        assert_eq!(alert.subject, "Water Quality Alert!");
        assert_eq!(
            alert.body,
            "Unsafe reading detected:\n\nTDS: 1600\nTemperature: 22.5°C\n\nPlease check your water system immediately."
        );
    }

    #[tokio::test]
    async fn test_disabled_sink_accepts_alerts() {
        let sink = from_config(&AlertsConfig::default()).unwrap();
        assert!(sink.send(&Alert::unsafe_reading(300.0, 40.0)).await.is_ok());
    }

    #[test]
    fn test_smtp_sink_rejects_bad_address() {
        let config = AlertsConfig {
            enabled: true,
            from: "not an address".to_string(),
            to: "1234567890@vtext.com".to_string(),
            ..AlertsConfig::default()
        };
        assert!(SmtpAlertSink::new(&config).is_err());
    }

    #[test]
    fn test_smtp_message_builds() {
        let config = AlertsConfig {
            enabled: true,
            from: "monitor@example.com".to_string(),
            to: "1234567890@vtext.com".to_string(),
            ..AlertsConfig::default()
        };
        let sink = SmtpAlertSink::new(&config).unwrap();
        let message = sink.message(&Alert::unsafe_reading(1600.0, 22.0)).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("Subject: Water Quality Alert!"));
        assert!(raw.contains("To: 1234567890@vtext.com"));
    }
}
