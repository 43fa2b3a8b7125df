use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ProbeType;

/// Lifecycle: `Created -> Sampling -> {Aborted | Completed}`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ProbeSessionStatus {
    #[default]
    Created,
    Sampling,
    Aborted,
    Completed,
}

impl ProbeSessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProbeSessionStatus::Aborted | ProbeSessionStatus::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
}

/// Mutable bookkeeping for one running probe. Owned by the probe table and
/// never handed out; callers see [`ProbeStatus`] snapshots instead.
#[derive(Debug, Clone)]
pub(crate) struct ActiveProbeSession {
    pub probe_id: String,
    pub probe_type: ProbeType,
    pub start_time: DateTime<Utc>,
    /// Set by the first recorded sample.
    pub start_temp: Option<f64>,
    pub max_drift: f64,
    pub samples: Vec<TemperatureSample>,
    pub outdoor_temp: Option<f64>,
    status: ProbeSessionStatus,
}

impl ActiveProbeSession {
    pub fn begin(
        probe_id: String,
        probe_type: ProbeType,
        start_time: DateTime<Utc>,
        max_drift: f64,
        outdoor_temp: Option<f64>,
    ) -> Self {
        Self {
            probe_id,
            probe_type,
            start_time,
            start_temp: None,
            max_drift,
            samples: Vec::new(),
            outdoor_temp,
            status: ProbeSessionStatus::Created,
        }
    }

    /// Returns false once the session reached a terminal state.
    pub fn record(&mut self, timestamp: DateTime<Utc>, temperature: f64) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if self.start_temp.is_none() {
            self.start_temp = Some(temperature);
        }
        self.samples.push(TemperatureSample {
            timestamp,
            temperature,
        });
        self.status = ProbeSessionStatus::Sampling;
        true
    }

    pub fn last_sample(&self) -> Option<&TemperatureSample> {
        self.samples.last()
    }

    pub fn current_drift(&self) -> f64 {
        match (self.start_temp, self.last_sample()) {
            (Some(start), Some(last)) => (last.temperature - start).abs(),
            _ => 0.0,
        }
    }

    /// End of the observation window: the last sample when there is one,
    /// otherwise the caller's clock.
    pub fn observation_end(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_sample().map(|s| s.timestamp).unwrap_or(now)
    }

    pub fn abort(&mut self) {
        self.status = ProbeSessionStatus::Aborted;
    }

    pub fn complete(&mut self) {
        self.status = ProbeSessionStatus::Completed;
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> ProbeStatus {
        let current_drift = self.current_drift();
        let completion_pct = if self.max_drift > 0.0 {
            (current_drift / self.max_drift * 100.0).min(100.0)
        } else {
            0.0
        };

        ProbeStatus {
            probe_id: self.probe_id.clone(),
            probe_type: self.probe_type,
            status: self.status,
            started_at: self.start_time,
            elapsed_secs: ((now - self.start_time).num_milliseconds() as f64 / 1000.0).max(0.0),
            start_temp: self.start_temp,
            current_drift,
            max_drift: self.max_drift,
            completion_pct,
            sample_count: self.samples.len(),
        }
    }
}

/// Read-only view of a running probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeStatus {
    pub probe_id: String,
    pub probe_type: ProbeType,
    pub status: ProbeSessionStatus,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: f64,
    pub start_temp: Option<f64>,
    pub current_drift: f64,
    pub max_drift: f64,
    pub completion_pct: f64,
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn first_sample_sets_start_temp_and_moves_to_sampling() {
        let t0 = Utc::now();
        let mut session = ActiveProbeSession::begin("p".into(), ProbeType::Active, t0, 2.0, None);
        assert_eq!(session.status, ProbeSessionStatus::Created);

        assert!(session.record(t0, 21.0));
        assert!(session.record(t0 + Duration::minutes(5), 21.5));
        assert_eq!(session.start_temp, Some(21.0));
        assert_eq!(session.status, ProbeSessionStatus::Sampling);
        assert!((session.current_drift() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn terminal_session_rejects_samples() {
        let t0 = Utc::now();
        let mut session = ActiveProbeSession::begin("p".into(), ProbeType::Active, t0, 2.0, None);
        session.abort();
        assert_eq!(session.status, ProbeSessionStatus::Aborted);
        assert!(!session.record(t0, 20.0));
        assert!(session.samples.is_empty());
    }

    #[test]
    fn snapshot_caps_completion_at_100() {
        let t0 = Utc::now();
        let mut session = ActiveProbeSession::begin("p".into(), ProbeType::Active, t0, 1.0, None);
        session.record(t0, 20.0);
        session.record(t0 + Duration::minutes(10), 17.5);

        let status = session.snapshot(t0 + Duration::minutes(12));
        assert_eq!(status.completion_pct, 100.0);
        assert_eq!(status.elapsed_secs, 720.0);
        assert_eq!(status.sample_count, 2);
    }
}
