//! Container-document migrations.
//!
//! The persisted container carries a top-level `version`. Legacy (v1)
//! documents predate the `thermal_data` section; migrating them stamps the
//! current version, adds an empty `thermal_data` placeholder, and copies every
//! other top-level field through untouched.

use serde_json::{Map, Value};

use crate::config::ValidationConfig;
use crate::{log_info, log_warn};

const ENABLE_LOGS: bool = true;

pub const CURRENT_DOCUMENT_VERSION: u32 = 2;
pub const THERMAL_DATA_KEY: &str = "thermal_data";

/// Upgrades legacy documents and repairs corrupt thermal data.
///
/// Validation lives in [`super::validation`].
#[derive(Debug, Clone, Default)]
pub struct ThermalDataMigrator {
    pub(crate) config: ValidationConfig,
}

impl ThermalDataMigrator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Bring `doc` to the current container version.
    ///
    /// Returns `None` for non-objects, empty objects, and versions this build
    /// does not know. Documents already at the current version come back
    /// unchanged, so the migration is idempotent.
    pub fn migrate_v1_to_v2(&self, doc: &Value) -> Option<Value> {
        let map = doc.as_object().filter(|m| !m.is_empty())?;

        let Some(mut version) = document_version(map) else {
            log_warn!(
                "Unrecognized persisted document version {:?}; refusing to migrate",
                map.get("version")
            );
            return None;
        };

        if version == CURRENT_DOCUMENT_VERSION {
            return Some(doc.clone());
        }

        let mut migrated = map.clone();
        while version < CURRENT_DOCUMENT_VERSION {
            let next_version = version + 1;
            migrated = apply_migration(migrated, next_version)?;
            version = next_version;
        }

        log_info!(
            "Migrated persisted document to version {}",
            CURRENT_DOCUMENT_VERSION
        );
        Some(Value::Object(migrated))
    }
}

/// Version of a container document. A missing `version` marks a legacy v1
/// document; strings (`"1.0"`) and integers (`1`) are both accepted.
pub fn document_version(doc: &Map<String, Value>) -> Option<u32> {
    let raw = match doc.get("version") {
        None => return Some(1),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok()?,
        Some(Value::Number(n)) => n.as_f64()?,
        Some(_) => return None,
    };

    if raw.fract() != 0.0 || raw < 1.0 || raw > CURRENT_DOCUMENT_VERSION as f64 {
        return None;
    }
    Some(raw as u32)
}

fn apply_migration(doc: Map<String, Value>, version: u32) -> Option<Map<String, Value>> {
    match version {
        2 => Some(migrate_to_v2(doc)),
        _ => {
            log_warn!("Unknown migration target version: {}", version);
            None
        }
    }
}

fn migrate_to_v2(doc: Map<String, Value>) -> Map<String, Value> {
    let mut migrated = Map::new();
    migrated.insert(
        "version".to_string(),
        Value::String(format!("{CURRENT_DOCUMENT_VERSION}.0")),
    );

    let mut thermal_data = Value::Object(Map::new());
    for (key, value) in doc {
        match key.as_str() {
            "version" => {}
            // An existing thermal_data object is kept and validated later.
            THERMAL_DATA_KEY if value.is_object() => thermal_data = value,
            THERMAL_DATA_KEY => {}
            _ => {
                migrated.insert(key, value);
            }
        }
    }
    migrated.insert(THERMAL_DATA_KEY.to_string(), thermal_data);
    migrated
}
