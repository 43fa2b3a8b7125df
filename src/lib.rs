//! Thermal learning core for a climate-control add-on.
//!
//! - [`cycle::CycleMonitor`] guards HVAC dwell times and spots short cycling.
//! - [`probe::ProbeManager`] runs active and passive probes and estimates the
//!   building's thermal time constant (tau).
//! - [`persistence::ThermalDataMigrator`] upgrades and repairs persisted state
//!   before anything else reads it.
//!
//! Logging goes through the `log` facade; call [`init_logging`] once if the
//! host has not installed a logger.

mod utils;

pub mod config;
pub mod cycle;
pub mod error;
pub mod models;
pub mod persistence;
pub mod probe;

pub use config::{CycleConfig, ProbeConfig, ThermalConfig, ValidationConfig};
pub use cycle::{CycleMonitor, CycleRecord};
pub use error::{NotifyError, ProbeError};
pub use models::{HvacMode, PersistedThermalState, ProbeResult, ProbeType, ThermalState};
pub use persistence::{ThermalDataMigrator, ThermalStore, ValidationClock};
pub use probe::{
    HistorySample, NotificationAction, Notifier, ProbeConditions, ProbeManager, ProbeStatus,
    ThermalModel,
};
pub use utils::init_logging;
