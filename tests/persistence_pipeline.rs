use chrono::{DateTime, Utc};
use serde_json::json;
use std::fs;
use thermal_core::{
    PersistedThermalState, ThermalDataMigrator, ThermalState, ThermalStore, ValidationClock,
    ValidationConfig,
};

fn clock() -> ValidationClock {
    ValidationClock::fixed(
        DateTime::parse_from_rfc3339("2024-09-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc),
    )
}

fn probe(tau: f64, day: u32) -> serde_json::Value {
    json!({
        "tau_value": tau,
        "confidence": 0.7,
        "duration": 2400,
        "fit_quality": 0.8,
        "aborted": false,
        "timestamp": format!("2024-08-{day:02}T03:00:00Z")
    })
}

#[test]
fn seven_valid_probes_keep_newest_five() {
    let doc = json!({
        "state": {"current_state": "calibrating", "last_transition": "2024-08-31T23:00:00Z"},
        "model": {
            "tau_cooling": 80.0,
            "tau_warming": 130.0,
            "last_modified": "2024-08-31T23:00:00Z"
        },
        "probe_history": (1..=7).map(|d| probe(40.0 + d as f64, d)).collect::<Vec<_>>(),
        "confidence": 0.5
    });

    let validated = ThermalDataMigrator::default()
        .validate_thermal_data_at(&doc, &clock())
        .unwrap();
    assert_eq!(validated.recoveries, 0);
    let taus: Vec<f64> = validated.state.probe_history.iter().map(|p| p.tau_value).collect();
    assert_eq!(taus, vec![43.0, 44.0, 45.0, 46.0, 47.0]);
}

#[test]
fn corrupt_taus_repair_to_defaults() {
    let doc = json!({
        "state": {"current_state": "drifting", "last_transition": "2024-08-31T23:00:00Z"},
        "model": {
            "tau_cooling": -50.0,
            "tau_warming": 2000.0,
            "last_modified": "2024-08-31T23:00:00Z"
        },
        "probe_history": [],
        "confidence": 0.5,
        "metadata": {"saves_count": 1, "corruption_recoveries": 0, "schema_version": "1.0"}
    });

    let validated = ThermalDataMigrator::default()
        .validate_thermal_data_at(&doc, &clock())
        .unwrap();
    assert_eq!(validated.state.model.tau_cooling, 90.0);
    assert_eq!(validated.state.model.tau_warming, 150.0);
    assert_eq!(validated.recoveries, 2);
}

#[test]
fn legacy_file_round_trips_through_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smart_climate.json");
    fs::write(
        &path,
        json!({"version": "1.0", "learned_offsets": [0.5, 0.7]}).to_string(),
    )
    .unwrap();

    let mut store = ThermalStore::new(path.clone(), ThermalDataMigrator::default());
    let mut loaded = store.load_at(&clock()).unwrap();
    assert_eq!(loaded.recoveries, 0);
    assert_eq!(loaded.state.state.current_state, ThermalState::Priming);

    loaded.state.state.current_state = ThermalState::Drifting;
    loaded.state.model.tau_cooling = 72.5;
    store.save_at(&mut loaded.state, clock().utc).unwrap();

    let mut reopened = ThermalStore::new(path, ThermalDataMigrator::default());
    let again = reopened.load_at(&clock()).unwrap();
    assert_eq!(again.state.state.current_state, ThermalState::Drifting);
    assert_eq!(again.state.model.tau_cooling, 72.5);
    assert_eq!(again.state.metadata.saves_count, 1);
}

#[test]
fn migration_then_validation_of_corrupt_section() {
    let migrator = ThermalDataMigrator::new(ValidationConfig::default());
    let container = json!({
        "version": "2.0",
        "thermal_data": {
            "state": {"current_state": 7},
            "model": {
                "tau_cooling": 100.0,
                "tau_warming": 100.0,
                "last_modified": "2024-08-01T00:00:00Z"
            },
            "probe_history": [probe(50.0, 3), {"tau_value": 50.0}],
            "confidence": "high",
            "metadata": []
        }
    });

    let migrated = migrator.migrate_v1_to_v2(&container).unwrap();
    assert_eq!(migrated, container);

    let validated = migrator
        .validate_thermal_data_at(&migrated["thermal_data"], &clock())
        .unwrap();
    // state section, one discarded probe, confidence, metadata
    assert_eq!(validated.recoveries, 4);
    assert_eq!(validated.state.probe_history.len(), 1);
    assert_ne!(
        validated.state,
        PersistedThermalState::default_at(clock().utc, &ValidationConfig::default())
    );
}
