use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ValidationConfig;

use super::{ProbeResult, ThermalState};

/// Format version of the thermal-data section itself.
pub const THERMAL_DATA_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateSection {
    pub current_state: ThermalState,
    pub last_transition: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelSection {
    pub tau_cooling: f64,
    pub tau_warming: f64,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub saves_count: u64,
    pub corruption_recoveries: u64,
    pub schema_version: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            saves_count: 0,
            corruption_recoveries: 0,
            schema_version: THERMAL_DATA_VERSION.to_string(),
        }
    }
}

/// Learned thermal state as stored between restarts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedThermalState {
    pub version: String,
    pub state: StateSection,
    pub model: ModelSection,
    pub probe_history: Vec<ProbeResult>,
    pub confidence: f64,
    pub metadata: Metadata,
}

impl PersistedThermalState {
    /// Fresh state with every field at its documented default.
    pub fn default_at(now: DateTime<Utc>, config: &ValidationConfig) -> Self {
        Self {
            version: THERMAL_DATA_VERSION.to_string(),
            state: StateSection {
                current_state: ThermalState::default(),
                last_transition: now,
            },
            model: ModelSection {
                tau_cooling: config.default_tau_cooling,
                tau_warming: config.default_tau_warming,
                last_modified: now,
            },
            probe_history: Vec::new(),
            confidence: config.default_confidence,
            metadata: Metadata::default(),
        }
    }

    /// Append a finished probe, keeping only the newest `limit` entries.
    pub fn push_probe_result(&mut self, result: ProbeResult, limit: usize) {
        self.probe_history.push(result);
        if self.probe_history.len() > limit {
            let excess = self.probe_history.len() - limit;
            self.probe_history.drain(..excess);
        }
    }
}
