use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::log_warn;

const ENABLE_LOGS: bool = true;

/// Dwell-time settings for [`crate::cycle::CycleMonitor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Minimum time the HVAC must stay off before it may turn on again.
    pub min_off_time_secs: u64,
    /// Minimum time the HVAC must stay on before it may turn off again.
    pub min_on_time_secs: u64,
    /// Average cycle length below which the system counts as short-cycling.
    pub short_cycle_threshold_secs: f64,
    pub history_capacity: usize,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            min_off_time_secs: 600,
            min_on_time_secs: 300,
            short_cycle_threshold_secs: 420.0,
            history_capacity: 50,
        }
    }
}

/// Gating, estimation and scoring settings for [`crate::probe::ProbeManager`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub max_concurrent_probes: usize,
    pub passive_detection_enabled: bool,

    /// Drift (°C) an active probe waits for unless the caller overrides it.
    pub default_max_drift: f64,
    /// HVAC must have been off at least this long before an active probe.
    pub min_off_stability_secs: f64,

    /// Passive window constraints
    pub passive_min_span_minutes: f64,
    pub passive_max_outdoor_range: f64,
    pub passive_min_indoor_drift: f64,

    /// Tau estimation
    pub tau_match_tolerance: f64,
    pub full_quality_samples: usize,
    pub linear_fallback_quality: f64,

    /// Confidence scoring
    pub data_adequacy_samples: usize,
    pub duration_adequacy_secs: f64,
    pub weight_data: f64,
    pub weight_duration: f64,
    pub weight_fit: f64,

    /// Results at or below this confidence never reach the thermal model.
    pub min_forward_confidence: f64,
    pub max_recent_results: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            max_concurrent_probes: 1,
            passive_detection_enabled: true,
            default_max_drift: 2.0,
            min_off_stability_secs: 600.0,
            passive_min_span_minutes: 60.0,
            passive_max_outdoor_range: 1.0,
            passive_min_indoor_drift: 1.0,
            tau_match_tolerance: 0.2,
            full_quality_samples: 10,
            linear_fallback_quality: 0.6,
            data_adequacy_samples: 20,
            duration_adequacy_secs: 1800.0,
            weight_data: 0.4,
            weight_duration: 0.3,
            weight_fit: 0.3,
            min_forward_confidence: 0.1,
            max_recent_results: 5,
        }
    }
}

/// Bounds and defaults applied when repairing persisted thermal data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub tau_min: f64,
    pub tau_max: f64,
    pub default_tau_cooling: f64,
    pub default_tau_warming: f64,
    pub default_confidence: f64,
    pub max_probe_history: usize,
    /// Clock skew tolerated for timestamps that sit in the future.
    pub future_tolerance_secs: i64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tau_min: 1.0,
            tau_max: 1000.0,
            default_tau_cooling: 90.0,
            default_tau_warming: 150.0,
            default_confidence: 0.0,
            max_probe_history: 5,
            future_tolerance_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThermalConfig {
    pub cycle: CycleConfig,
    pub probe: ProbeConfig,
    pub validation: ValidationConfig,
}

impl ThermalConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields defaults. A file that exists but does not parse also
    /// yields defaults, with a warning, so a bad edit never blocks startup.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        match serde_json::from_str(&contents) {
            Ok(config) => Ok(config),
            Err(err) => {
                log_warn!(
                    "Ignoring malformed config at {}: {}; using defaults",
                    path.display(),
                    err
                );
                Ok(Self::default())
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }

    /// Reject settings no component can operate with.
    pub fn validate(&self) -> Result<()> {
        let probe = &self.probe;
        if probe.max_concurrent_probes == 0 {
            bail!("max_concurrent_probes must be at least 1");
        }
        if !(probe.default_max_drift > 0.0) {
            bail!("default_max_drift must be positive");
        }
        let weight_sum = probe.weight_data + probe.weight_duration + probe.weight_fit;
        if (weight_sum - 1.0).abs() > 1e-6 {
            bail!("confidence weights must sum to 1.0 (got {weight_sum})");
        }
        if probe.data_adequacy_samples == 0 || probe.full_quality_samples == 0 {
            bail!("sample adequacy thresholds must be at least 1");
        }
        if !(probe.duration_adequacy_secs > 0.0) {
            bail!("duration_adequacy_secs must be positive");
        }

        let validation = &self.validation;
        if !(validation.tau_min < validation.tau_max) {
            bail!(
                "tau_min ({}) must be below tau_max ({})",
                validation.tau_min,
                validation.tau_max
            );
        }
        for (name, value) in [
            ("default_tau_cooling", validation.default_tau_cooling),
            ("default_tau_warming", validation.default_tau_warming),
        ] {
            if value < validation.tau_min || value > validation.tau_max {
                bail!("{name} ({value}) lies outside the tau bounds");
            }
        }
        if !(0.0..=1.0).contains(&validation.default_confidence) {
            bail!("default_confidence must lie in [0, 1]");
        }
        if validation.future_tolerance_secs < 0 {
            bail!("future_tolerance_secs must not be negative");
        }

        if self.cycle.history_capacity == 0 {
            bail!("cycle history_capacity must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ThermalConfig::default();
        assert_eq!(config.cycle.min_off_time_secs, 600);
        assert_eq!(config.cycle.min_on_time_secs, 300);
        assert_eq!(config.probe.max_concurrent_probes, 1);
        assert!(config.probe.passive_detection_enabled);
        assert_eq!(config.validation.default_tau_cooling, 90.0);
        assert_eq!(config.validation.default_tau_warming, 150.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ThermalConfig::load(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, ThermalConfig::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"cycle": {"min_off_time_secs": 900}, "probe": {"passive_detection_enabled": false}}"#,
        )
        .unwrap();

        let config = ThermalConfig::load(&path).unwrap();
        assert_eq!(config.cycle.min_off_time_secs, 900);
        assert_eq!(config.cycle.min_on_time_secs, 300);
        assert!(!config.probe.passive_detection_enabled);
        assert_eq!(config.probe.max_concurrent_probes, 1);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(ThermalConfig::load(&path).unwrap(), ThermalConfig::default());
    }

    #[test]
    fn save_then_load_preserves_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut config = ThermalConfig::default();
        config.probe.max_concurrent_probes = 3;
        config.validation.max_probe_history = 8;
        config.save(&path).unwrap();

        assert_eq!(ThermalConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn validate_rejects_bad_weights_and_bounds() {
        let mut config = ThermalConfig::default();
        config.probe.weight_fit = 0.5;
        assert!(config.validate().is_err());

        let mut config = ThermalConfig::default();
        config.validation.tau_min = 2000.0;
        assert!(config.validate().is_err());

        let mut config = ThermalConfig::default();
        config.probe.max_concurrent_probes = 0;
        assert!(config.validate().is_err());
    }
}
