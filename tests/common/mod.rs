#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use thermal_core::{
    HistorySample, HvacMode, NotificationAction, Notifier, NotifyError, ProbeResult, ThermalModel,
};

#[derive(Debug, Default)]
pub struct RecordingModel {
    pub updates: Vec<(ProbeResult, bool)>,
}

impl ThermalModel for RecordingModel {
    fn update_tau(&mut self, result: &ProbeResult, is_cooling: bool) {
        self.updates.push((result.clone(), is_cooling));
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub open: Vec<String>,
    pub created: usize,
    pub dismissed: usize,
}

impl Notifier for RecordingNotifier {
    fn create(
        &mut self,
        _title: &str,
        _message: &str,
        notification_id: &str,
        _actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        self.created += 1;
        self.open.push(notification_id.to_string());
        Ok(())
    }

    fn dismiss(&mut self, notification_id: &str) -> Result<(), NotifyError> {
        self.dismissed += 1;
        self.open.retain(|id| id != notification_id);
        Ok(())
    }
}

pub fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-20T22:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Newton cooling toward `ambient` with time constant `tau_minutes`, sampled
/// every `step_minutes`.
pub fn exponential_curve(
    start: f64,
    ambient: f64,
    tau_minutes: f64,
    step_minutes: i64,
    samples: usize,
) -> Vec<(DateTime<Utc>, f64)> {
    (0..samples)
        .map(|i| {
            let minutes = i as i64 * step_minutes;
            let temp = ambient + (start - ambient) * (-(minutes as f64) / tau_minutes).exp();
            (base_time() + Duration::minutes(minutes), temp)
        })
        .collect()
}

pub fn off_history(curve: &[(DateTime<Utc>, f64)], outdoor: f64) -> Vec<HistorySample> {
    curve
        .iter()
        .map(|(timestamp, indoor)| HistorySample {
            hvac_mode: HvacMode::Off,
            timestamp: *timestamp,
            indoor_temp: *indoor,
            outdoor_temp: Some(outdoor),
        })
        .collect()
}
