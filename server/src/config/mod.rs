//! Server configuration

use anyhow::{Context, Result};
use policy::{AiGate, Thresholds};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub stats: StatsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_bind_port")]
    pub bind_port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_dashboard_port")]
    pub bind_port: u16,
    /// Served verbatim; the built-in page is used when unset
    #[serde(default)]
    pub html_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// Empty disables assessments; `GEMINI_API_KEY` fills it in
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_tds_cutoff")]
    pub tds_cutoff: f64,
    #[serde(default = "default_ai_timeout_sec")]
    pub timeout_sec: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    /// `SMTP_PASSWORD` fills it in when empty
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from: String,
    /// Usually an email-to-SMS gateway address, e.g. 1234567890@vtext.com
    #[serde(default)]
    pub to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsConfig {
    #[serde(default = "default_downtime_hours")]
    pub downtime_hours_per_analysis: f64,
    #[serde(default = "default_downtime_cost")]
    pub downtime_cost_per_hour: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_bind_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "cooling_system.db".to_string()
}

fn default_dashboard_port() -> u16 {
    8080
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_tds_cutoff() -> f64 {
    policy::constants::DEFAULT_AI_TDS_CUTOFF
}

fn default_ai_timeout_sec() -> u64 {
    30
}

fn default_smtp_host() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_downtime_hours() -> f64 {
    0.5
}

fn default_downtime_cost() -> f64 {
    540_000.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            database_path: default_database_path(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_port: default_dashboard_port(),
            html_path: None,
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            endpoint: default_endpoint(),
            tds_cutoff: default_tds_cutoff(),
            timeout_sec: default_ai_timeout_sec(),
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from: String::new(),
            to: String::new(),
        }
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            downtime_hours_per_analysis: default_downtime_hours(),
            downtime_cost_per_hour: default_downtime_cost(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AiConfig {
    pub fn key_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn gate(&self) -> AiGate {
        AiGate::new(self.tds_cutoff, self.key_configured())
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        let mut config = Self::parse(&content)?;
        config.apply_env(|name| std::env::var(name).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Fill empty secrets from the environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.ai.key_configured() {
            if let Some(key) = lookup("GEMINI_API_KEY") {
                self.ai.api_key = key;
            }
        }

        if self.alerts.password.is_empty() {
            if let Some(password) = lookup("SMTP_PASSWORD") {
                self.alerts.password = password;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.thresholds
            .validate()
            .context("Invalid [thresholds] section")?;

        if !self.ai.tds_cutoff.is_finite() {
            anyhow::bail!("ai.tds_cutoff must be a finite number");
        }

        if self.alerts.enabled && (self.alerts.from.is_empty() || self.alerts.to.is_empty()) {
            anyhow::bail!("alerts.from and alerts.to are required when alerts are enabled");
        }

        if self.stats.downtime_hours_per_analysis < 0.0 || self.stats.downtime_cost_per_hour < 0.0 {
            anyhow::bail!("[stats] values must not be negative");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.general.bind_port, 8000);
        assert_eq!(config.dashboard.bind_port, 8080);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.ai.tds_cutoff, 1000.0);
        assert!(!config.ai.key_configured());
        assert!(!config.alerts.enabled);
        assert_eq!(config.stats.downtime_cost_per_hour, 540_000.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_threshold_override() {
        let config = Config::parse(
            r#"
            [thresholds.TDS]
            optimal_min = 50
            optimal_max = 600
            warning_max = 1100
            critical_max = 1400

            [thresholds.temperature]
            optimal_min = 18
            optimal_max = 27
            warning_min = 15
            warning_max = 32
            critical_min = 10
            critical_max = 35
            "#,
        )
        .unwrap();

        assert_eq!(config.thresholds.tds.optimal_max, 600.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let config = Config::parse(
            r#"
            [thresholds.TDS]
            optimal_min = 600
            optimal_max = 500
            warning_max = 1200
            critical_max = 1500

            [thresholds.temperature]
            optimal_min = 18
            optimal_max = 27
            warning_min = 15
            warning_max = 32
            critical_min = 10
            critical_max = 35
            "#,
        )
        .unwrap();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_fills_missing_secrets_only() {
        let mut config = Config::parse("[ai]\napi_key = \"from-file\"").unwrap();
        config.apply_env(|name| match name {
            "GEMINI_API_KEY" => Some("from-env".to_string()),
            "SMTP_PASSWORD" => Some("hunter2".to_string()),
            _ => None,
        });
        assert_eq!(config.ai.api_key, "from-file");
        assert_eq!(config.alerts.password, "hunter2");

        let mut config = Config::parse("").unwrap();
        config.apply_env(|name| (name == "GEMINI_API_KEY").then(|| "from-env".to_string()));
        assert!(config.ai.gate().key_configured);
    }

    #[test]
    fn test_enabled_alerts_need_addresses() {
        let config = Config::parse("[alerts]\nenabled = true\nfrom = \"a@example.com\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[general]\nbind_port = 9000\ndatabase_path = \"test.db\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.general.bind_port, 9000);
        assert_eq!(config.general.database_path, "test.db");
    }
}
