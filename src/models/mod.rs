mod persisted;
mod probe;
mod thermal_state;

pub use persisted::{
    Metadata, ModelSection, PersistedThermalState, StateSection, THERMAL_DATA_VERSION,
};
pub use probe::{ProbeResult, ProbeType};
pub use thermal_state::{HvacMode, ThermalState};
