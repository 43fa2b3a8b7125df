use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::{fs, path::PathBuf};

use crate::models::PersistedThermalState;
use crate::{log_info, log_warn};

use super::migrations::{ThermalDataMigrator, CURRENT_DOCUMENT_VERSION, THERMAL_DATA_KEY};
use super::timestamps::ValidationClock;

const ENABLE_LOGS: bool = true;

/// Thermal state as it came off disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedThermalState {
    pub state: PersistedThermalState,
    /// Defaults applied while loading; already added to
    /// `state.metadata.corruption_recoveries`.
    pub recoveries: u32,
}

/// JSON file holding the versioned container document.
///
/// Loading always goes migrate, then validate. Container fields other than
/// `version` and `thermal_data` are carried through to the next save.
pub struct ThermalStore {
    path: PathBuf,
    migrator: ThermalDataMigrator,
    container: Map<String, Value>,
}

impl ThermalStore {
    pub fn new(path: PathBuf, migrator: ThermalDataMigrator) -> Self {
        Self {
            path,
            migrator,
            container: Map::new(),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&mut self) -> Result<LoadedThermalState> {
        self.load_at(&ValidationClock::now())
    }

    /// Read, migrate and validate. A missing, unparsable, or unmigratable
    /// file produces fresh defaults rather than an error; only I/O failures
    /// on an existing file are reported.
    pub fn load_at(&mut self, clock: &ValidationClock) -> Result<LoadedThermalState> {
        let fresh = || LoadedThermalState {
            state: PersistedThermalState::default_at(clock.utc, self.migrator.config()),
            recoveries: 0,
        };

        if !self.path.exists() {
            log_info!("No thermal state at {}; starting fresh", self.path.display());
            self.container = Map::new();
            return Ok(fresh());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read thermal state from {}", self.path.display()))?;

        let raw: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                log_warn!(
                    "Thermal state at {} is not valid JSON ({}); starting fresh",
                    self.path.display(),
                    err
                );
                self.container = Map::new();
                return Ok(fresh());
            }
        };

        let Some(Value::Object(mut container)) = self.migrator.migrate_v1_to_v2(&raw) else {
            log_warn!(
                "Thermal state at {} could not be migrated; starting fresh",
                self.path.display()
            );
            self.container = Map::new();
            return Ok(fresh());
        };

        let thermal_data = container
            .remove(THERMAL_DATA_KEY)
            .unwrap_or_else(|| Value::Object(Map::new()));
        self.container = container;

        let Some(validated) = self.migrator.validate_thermal_data_at(&thermal_data, clock) else {
            log_warn!("thermal_data section is not an object; starting fresh");
            return Ok(fresh());
        };

        let mut state = validated.state;
        state.metadata.corruption_recoveries += u64::from(validated.recoveries);
        Ok(LoadedThermalState {
            state,
            recoveries: validated.recoveries,
        })
    }

    pub fn save(&mut self, state: &mut PersistedThermalState) -> Result<()> {
        self.save_at(state, Utc::now())
    }

    /// Write `state` back, bumping `metadata.saves_count`. The file is replaced
    /// via a sibling temp file so a crash never leaves half a document.
    pub fn save_at(&mut self, state: &mut PersistedThermalState, now: DateTime<Utc>) -> Result<()> {
        state.metadata.saves_count += 1;

        let mut container = self.container.clone();
        container.insert(
            "version".to_string(),
            Value::String(format!("{CURRENT_DOCUMENT_VERSION}.0")),
        );
        container.insert(
            THERMAL_DATA_KEY.to_string(),
            serde_json::to_value(&*state).context("Failed to serialise thermal state")?,
        );
        container.insert("saved_at".to_string(), Value::String(now.to_rfc3339()));

        let serialized = serde_json::to_string_pretty(&Value::Object(container.clone()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, serialized)
            .with_context(|| format!("Failed to write thermal state to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to move thermal state into {}", self.path.display()))?;

        container.remove(THERMAL_DATA_KEY);
        self.container = container;
        Ok(())
    }
}
