//! Coolwatch Policy Library
//!
//! Shared definitions for the coolwatch device reader and server.
//! This includes the threshold table, the severity classifier, the AI
//! cost-gate, recommendation extraction and the JSON wire types.

pub mod classify;
pub mod constants;
pub mod error;
pub mod gate;
pub mod recommendations;
pub mod thresholds;
pub mod wire;

pub use classify::{classify, Classification, Severity};
pub use error::PolicyError;
pub use gate::AiGate;
pub use recommendations::{extract_recommendations, recommendations_or_fallback};
pub use thresholds::{TdsThresholds, TemperatureThresholds, Thresholds};
pub use wire::{AnalysisPayload, IngestResponse, SensorInput};
