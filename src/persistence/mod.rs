pub mod migrations;
pub mod store;
pub mod timestamps;
pub mod validation;

pub use migrations::{ThermalDataMigrator, CURRENT_DOCUMENT_VERSION, THERMAL_DATA_KEY};
pub use store::{LoadedThermalState, ThermalStore};
pub use timestamps::{parse_timestamp, validate_timestamp, ParsedTimestamp, ValidationClock};
pub use validation::{Repaired, ValidatedThermalData};
