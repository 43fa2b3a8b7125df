use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProbeType {
    /// Started on request; the HVAC is held off while drift is observed.
    #[default]
    Active,
    /// Reconstructed from history the building produced on its own.
    Passive,
}

impl ProbeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeType::Active => "active",
            ProbeType::Passive => "passive",
        }
    }
}

/// Outcome of one finished probe. Built once at completion and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    /// Thermal time constant in minutes.
    pub tau_value: f64,
    pub confidence: f64,
    /// Observation window length in seconds.
    pub duration: f64,
    pub fit_quality: f64,
    pub aborted: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub outdoor_temp: Option<f64>,
    #[serde(default)]
    pub probe_type: ProbeType,
}

impl ProbeResult {
    /// True when the estimate is usable by a thermal model at all.
    pub fn has_estimate(&self) -> bool {
        !self.aborted && self.tau_value > 0.0
    }
}
