pub mod collaborators;
pub mod estimation;
pub mod manager;
pub mod passive;
pub mod scoring;
pub mod session;

pub use collaborators::{NotificationAction, Notifier, ThermalModel};
pub use estimation::{estimate_tau, TauEstimate};
pub use manager::{ProbeConditions, ProbeManager};
pub use passive::HistorySample;
pub use session::{ProbeSessionStatus, ProbeStatus, TemperatureSample};
