pub mod monitor;

pub use monitor::{CycleMonitor, CycleRecord};
