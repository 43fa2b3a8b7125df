//! Tiered repair of persisted thermal data.
//!
//! Each section runs through a validate-or-default function that returns the
//! usable value together with the number of defaults it had to apply. The
//! totals are summed; nothing here fails.
//!
//! - system level: the `state` section is replaced as a whole when its
//!   `current_state` is unusable
//! - field level: taus, `confidence` and timestamps default one by one
//! - object level: a probe-history entry either passes every check or is
//!   dropped entirely

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::config::ValidationConfig;
use crate::models::{
    Metadata, ModelSection, PersistedThermalState, ProbeResult, ProbeType, StateSection,
    ThermalState, THERMAL_DATA_VERSION,
};
use crate::{log_debug, log_warn};

use super::migrations::ThermalDataMigrator;
use super::timestamps::{validate_timestamp, ValidationClock};

const ENABLE_LOGS: bool = true;

const PROBE_REQUIRED_FIELDS: [&str; 6] = [
    "tau_value",
    "confidence",
    "duration",
    "fit_quality",
    "aborted",
    "timestamp",
];

/// A value that passed validation or was replaced by its default.
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub value: T,
    pub recoveries: u32,
}

impl<T> Repaired<T> {
    fn ok(value: T) -> Self {
        Self {
            value,
            recoveries: 0,
        }
    }

    fn defaulted(value: T) -> Self {
        Self {
            value,
            recoveries: 1,
        }
    }
}

/// Sanitised thermal data plus how many defaults were applied to get there.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedThermalData {
    pub state: PersistedThermalState,
    pub recoveries: u32,
}

impl ThermalDataMigrator {
    pub fn validate_thermal_data(&self, doc: &Value) -> Option<ValidatedThermalData> {
        self.validate_thermal_data_at(doc, &ValidationClock::now())
    }

    /// Repair `doc` into a usable [`PersistedThermalState`].
    ///
    /// Only a non-object document yields `None`; the caller then starts from
    /// fresh defaults. An empty object is the default document with no
    /// recoveries charged.
    pub fn validate_thermal_data_at(
        &self,
        doc: &Value,
        clock: &ValidationClock,
    ) -> Option<ValidatedThermalData> {
        let map = doc.as_object()?;
        let config = &self.config;

        if map.is_empty() {
            return Some(ValidatedThermalData {
                state: PersistedThermalState::default_at(clock.utc, config),
                recoveries: 0,
            });
        }

        let state = validate_state_section(map.get("state"), config, clock);
        let model = validate_model_section(map.get("model"), config, clock);
        let history = validate_probe_history(map.get("probe_history"), config, clock);
        let confidence = validate_unit_interval(map.get("confidence"), config.default_confidence);
        let metadata = validate_metadata(map.get("metadata"));

        let recoveries = state.recoveries
            + model.recoveries
            + history.recoveries
            + confidence.recoveries
            + metadata.recoveries;

        if confidence.recoveries > 0 {
            log_debug!("confidence replaced with default {}", config.default_confidence);
        }
        if recoveries > 0 {
            log_warn!(
                "Thermal data repaired: {} recoveries \
                 (state {}, model {}, probe history {}, confidence {}, metadata {})",
                recoveries,
                state.recoveries,
                model.recoveries,
                history.recoveries,
                confidence.recoveries,
                metadata.recoveries
            );
        }

        Some(ValidatedThermalData {
            state: PersistedThermalState {
                version: version_string(map.get("version")),
                state: state.value,
                model: model.value,
                probe_history: history.value,
                confidence: confidence.value,
                metadata: metadata.value,
            },
            recoveries,
        })
    }

    /// JSON-in, JSON-out form of [`Self::validate_thermal_data_at`].
    pub fn validate_value_at(&self, doc: &Value, clock: &ValidationClock) -> Option<(Value, u32)> {
        let validated = self.validate_thermal_data_at(doc, clock)?;
        match serde_json::to_value(&validated.state) {
            Ok(value) => Some((value, validated.recoveries)),
            Err(err) => {
                log_warn!("Failed to serialise validated thermal data: {}", err);
                None
            }
        }
    }
}

fn validate_state_section(
    section: Option<&Value>,
    config: &ValidationConfig,
    clock: &ValidationClock,
) -> Repaired<StateSection> {
    let current_state = section
        .and_then(Value::as_object)
        .and_then(|s| s.get("current_state"))
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<ThermalState>().ok());

    let Some(current_state) = current_state else {
        log_debug!("state section unusable; resetting to {}", ThermalState::default());
        return Repaired::defaulted(StateSection {
            current_state: ThermalState::default(),
            last_transition: clock.utc,
        });
    };

    let transition = section
        .and_then(Value::as_object)
        .and_then(|s| s.get("last_transition"));
    let last_transition =
        validate_timestamp_field("state.last_transition", transition, config, clock);

    Repaired {
        value: StateSection {
            current_state,
            last_transition: last_transition.value,
        },
        recoveries: last_transition.recoveries,
    }
}

fn validate_model_section(
    section: Option<&Value>,
    config: &ValidationConfig,
    clock: &ValidationClock,
) -> Repaired<ModelSection> {
    let empty = Map::new();
    let model = section.and_then(Value::as_object).unwrap_or(&empty);

    let tau_cooling = validate_tau(
        "tau_cooling",
        model.get("tau_cooling"),
        config.default_tau_cooling,
        config,
    );
    let tau_warming = validate_tau(
        "tau_warming",
        model.get("tau_warming"),
        config.default_tau_warming,
        config,
    );
    let last_modified =
        validate_timestamp_field("model.last_modified", model.get("last_modified"), config, clock);

    Repaired {
        value: ModelSection {
            tau_cooling: tau_cooling.value,
            tau_warming: tau_warming.value,
            last_modified: last_modified.value,
        },
        recoveries: tau_cooling.recoveries + tau_warming.recoveries + last_modified.recoveries,
    }
}

fn validate_tau(
    name: &str,
    value: Option<&Value>,
    default: f64,
    config: &ValidationConfig,
) -> Repaired<f64> {
    match value.and_then(Value::as_f64) {
        Some(tau) if tau_in_range(tau, config) => Repaired::ok(tau),
        _ => {
            log_debug!(
                "{} {:?} outside [{}, {}]; using {}",
                name,
                value,
                config.tau_min,
                config.tau_max,
                default
            );
            Repaired::defaulted(default)
        }
    }
}

fn tau_in_range(tau: f64, config: &ValidationConfig) -> bool {
    tau.is_finite() && tau >= config.tau_min && tau <= config.tau_max
}

fn validate_unit_interval(value: Option<&Value>, default: f64) -> Repaired<f64> {
    match value.and_then(Value::as_f64) {
        Some(v) if is_unit_interval(v) => Repaired::ok(v),
        _ => Repaired::defaulted(default),
    }
}

fn is_unit_interval(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn validate_timestamp_field(
    name: &str,
    value: Option<&Value>,
    config: &ValidationConfig,
    clock: &ValidationClock,
) -> Repaired<DateTime<Utc>> {
    match validate_timestamp(value, clock, config.future_tolerance_secs) {
        Some(ts) => Repaired::ok(ts),
        None => {
            log_debug!("{} {:?} invalid; using now", name, value);
            Repaired::defaulted(clock.utc)
        }
    }
}

fn validate_probe_history(
    value: Option<&Value>,
    config: &ValidationConfig,
    clock: &ValidationClock,
) -> Repaired<Vec<ProbeResult>> {
    let entries = match value {
        None | Some(Value::Null) => return Repaired::ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            log_debug!("probe_history is not a list ({:?}); clearing", other);
            return Repaired::defaulted(Vec::new());
        }
    };

    let mut kept = Vec::with_capacity(entries.len());
    let mut discarded = 0u32;
    for (index, entry) in entries.iter().enumerate() {
        match validate_probe_entry(entry, config, clock) {
            Some(result) => kept.push(result),
            None => {
                log_debug!("probe_history[{}] failed validation; discarding", index);
                discarded += 1;
            }
        }
    }

    // Keep the newest entries; trimming a clean list is not a repair.
    if kept.len() > config.max_probe_history {
        let excess = kept.len() - config.max_probe_history;
        kept.drain(..excess);
    }

    Repaired {
        value: kept,
        recoveries: discarded,
    }
}

/// An entry survives only if every check passes.
fn validate_probe_entry(
    entry: &Value,
    config: &ValidationConfig,
    clock: &ValidationClock,
) -> Option<ProbeResult> {
    let entry = entry.as_object()?;
    if !PROBE_REQUIRED_FIELDS.iter().all(|field| entry.contains_key(*field)) {
        return None;
    }

    let tau_value = entry.get("tau_value")?.as_f64().filter(|t| tau_in_range(*t, config))?;
    let confidence = entry.get("confidence")?.as_f64().filter(|c| is_unit_interval(*c))?;
    let duration = entry
        .get("duration")?
        .as_f64()
        .filter(|d| d.is_finite() && *d > 0.0)?;
    let fit_quality = entry.get("fit_quality")?.as_f64().filter(|q| is_unit_interval(*q))?;
    let aborted = entry.get("aborted")?.as_bool()?;
    let timestamp =
        validate_timestamp(entry.get("timestamp"), clock, config.future_tolerance_secs)?;

    let outdoor_temp = entry
        .get("outdoor_temp")
        .and_then(Value::as_f64)
        .filter(|t| t.is_finite());
    let probe_type = match entry.get("probe_type").and_then(Value::as_str) {
        Some("passive") => ProbeType::Passive,
        _ => ProbeType::Active,
    };

    Some(ProbeResult {
        tau_value,
        confidence,
        duration,
        fit_quality,
        aborted,
        timestamp,
        outdoor_temp,
        probe_type,
    })
}

/// Absent metadata is simply defaulted; a present-but-malformed section is a
/// recovery. Individual keys fall back silently.
fn validate_metadata(value: Option<&Value>) -> Repaired<Metadata> {
    let map = match value {
        None => return Repaired::ok(Metadata::default()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            log_debug!("metadata is not an object ({:?}); resetting", other);
            return Repaired::defaulted(Metadata::default());
        }
    };

    let defaults = Metadata::default();
    Repaired::ok(Metadata {
        saves_count: map
            .get("saves_count")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.saves_count),
        corruption_recoveries: map
            .get("corruption_recoveries")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.corruption_recoveries),
        schema_version: map
            .get("schema_version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(defaults.schema_version),
    })
}

fn version_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => THERMAL_DATA_VERSION.to_string(),
    }
}
