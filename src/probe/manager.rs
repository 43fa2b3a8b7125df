use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ProbeConfig;
use crate::error::ProbeError;
use crate::models::{HvacMode, ProbeResult, ProbeType, ThermalState};
use crate::{log_debug, log_error, log_info, log_warn};

use super::collaborators::{NotificationAction, Notifier, ThermalModel};
use super::estimation::{estimate_tau, TauEstimate};
use super::passive::{indoor_curve, is_passive_window, HistorySample};
use super::scoring::compute_confidence;
use super::session::{ActiveProbeSession, ProbeStatus, TemperatureSample};

const ENABLE_LOGS: bool = true;

const NOTIFICATION_TITLE: &str = "Thermal Probe Active";

/// Telemetry snapshot used to gate an active probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeConditions {
    pub indoor_temp: Option<f64>,
    pub outdoor_temp: Option<f64>,
    pub hvac_mode: Option<HvacMode>,
    /// Seconds the HVAC has been continuously off.
    pub hvac_off_duration_secs: Option<f64>,
    pub thermal_state: Option<ThermalState>,
}

/// Runs active probes, recognises passive ones, and hands accepted tau
/// estimates to the thermal model.
///
/// All mutation goes through `&mut self`, so the limit check and the insert in
/// [`ProbeManager::start_active_probe`] cannot interleave. Hosts sharing a
/// manager across threads wrap the whole manager in a mutex.
pub struct ProbeManager<M, N> {
    config: ProbeConfig,
    active: HashMap<String, ActiveProbeSession>,
    model: M,
    notifier: N,
    recent_results: VecDeque<ProbeResult>,
}

impl<M: ThermalModel, N: Notifier> ProbeManager<M, N> {
    pub fn new(config: ProbeConfig, model: M, notifier: N) -> Self {
        Self {
            config,
            active: HashMap::new(),
            model,
            notifier,
            recent_results: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn active_probe_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_probe_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.active.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Completed results, oldest first, bounded by `max_recent_results`.
    pub fn recent_results(&self) -> impl Iterator<Item = &ProbeResult> {
        self.recent_results.iter()
    }

    /// Whether an active probe may start under `conditions`.
    pub fn can_start_probe(&self, conditions: &ProbeConditions) -> bool {
        if self.active.len() >= self.config.max_concurrent_probes {
            log_debug!(
                "Probe refused: {} of {} slots in use",
                self.active.len(),
                self.config.max_concurrent_probes
            );
            return false;
        }

        let (Some(indoor), Some(mode), Some(off_secs), Some(state)) = (
            conditions.indoor_temp,
            conditions.hvac_mode,
            conditions.hvac_off_duration_secs,
            conditions.thermal_state,
        ) else {
            log_debug!("Probe refused: telemetry incomplete {:?}", conditions);
            return false;
        };

        if !indoor.is_finite() || !off_secs.is_finite() {
            log_debug!("Probe refused: non-finite telemetry");
            return false;
        }
        if !mode.is_off() {
            log_debug!("Probe refused: hvac mode is {}", mode);
            return false;
        }
        if off_secs < self.config.min_off_stability_secs {
            log_debug!(
                "Probe refused: hvac off for {:.0}s, need {:.0}s",
                off_secs,
                self.config.min_off_stability_secs
            );
            return false;
        }
        if !state.allows_probing() {
            log_debug!("Probe refused: thermal state is {}", state);
            return false;
        }
        true
    }

    pub fn start_active_probe(
        &mut self,
        max_drift: Option<f64>,
        conditions: Option<&ProbeConditions>,
    ) -> Result<String, ProbeError> {
        self.start_active_probe_at(max_drift, conditions, Utc::now())
    }

    /// Register a new active probe and announce it.
    ///
    /// The drift target is `max_drift` when given, else `default_max_drift`;
    /// stored user preferences are not consulted. Nothing is registered unless
    /// the notifier accepts the progress notice.
    pub fn start_active_probe_at(
        &mut self,
        max_drift: Option<f64>,
        conditions: Option<&ProbeConditions>,
        now: DateTime<Utc>,
    ) -> Result<String, ProbeError> {
        let limit = self.config.max_concurrent_probes;
        if self.active.len() >= limit {
            log_warn!(
                "Refusing to start probe: {} active, limit {}",
                self.active.len(),
                limit
            );
            return Err(ProbeError::ConcurrencyLimit {
                active: self.active.len(),
                limit,
            });
        }

        let drift = max_drift
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(self.config.default_max_drift);
        let outdoor_temp = conditions.and_then(|c| c.outdoor_temp);

        let probe_id = Uuid::new_v4().to_string();
        let session = ActiveProbeSession::begin(
            probe_id.clone(),
            ProbeType::Active,
            now,
            drift,
            outdoor_temp,
        );

        let message = format!(
            "Learning how quickly your home gains or loses heat. \
             The HVAC stays off until the indoor temperature drifts {drift:.1}°C."
        );
        let actions = [NotificationAction {
            action: format!("abort_probe_{probe_id}"),
            title: "Abort Probe".to_string(),
        }];
        self.notifier.create(
            NOTIFICATION_TITLE,
            &message,
            &notification_id(&probe_id),
            &actions,
        )?;

        self.active.insert(probe_id.clone(), session);
        log_info!("Started active probe {} (max drift {:.1}°C)", probe_id, drift);
        Ok(probe_id)
    }

    pub fn record_sample(&mut self, probe_id: &str, temperature: f64) -> Result<bool, ProbeError> {
        self.record_sample_at(probe_id, temperature, Utc::now())
    }

    /// Append a temperature reading to a running probe. Non-finite readings are
    /// dropped and reported as `Ok(false)`.
    pub fn record_sample_at(
        &mut self,
        probe_id: &str,
        temperature: f64,
        timestamp: DateTime<Utc>,
    ) -> Result<bool, ProbeError> {
        let session = self
            .active
            .get_mut(probe_id)
            .ok_or_else(|| ProbeError::UnknownProbe(probe_id.to_string()))?;

        if !temperature.is_finite() {
            log_warn!("Dropping non-finite sample for probe {}", probe_id);
            return Ok(false);
        }
        Ok(session.record(timestamp, temperature))
    }

    /// True once the probe drifted at least its target amount.
    pub fn is_drift_reached(&self, probe_id: &str) -> bool {
        self.active
            .get(probe_id)
            .map(|s| s.current_drift() >= s.max_drift)
            .unwrap_or(false)
    }

    pub fn get_probe_status(&self, probe_id: &str) -> Option<ProbeStatus> {
        self.get_probe_status_at(probe_id, Utc::now())
    }

    pub fn get_probe_status_at(&self, probe_id: &str, now: DateTime<Utc>) -> Option<ProbeStatus> {
        self.active.get(probe_id).map(|s| s.snapshot(now))
    }

    /// Cancel a probe. Returns false for an unknown id.
    pub fn abort_probe(&mut self, probe_id: &str) -> bool {
        let Some(mut session) = self.active.remove(probe_id) else {
            log_debug!("Abort requested for unknown probe {}", probe_id);
            return false;
        };

        session.abort();
        self.dismiss_notification(probe_id);
        log_info!(
            "Aborted probe {} after {} samples",
            probe_id,
            session.samples.len()
        );
        true
    }

    pub fn complete_probe(&mut self, probe_id: &str) -> Option<ProbeResult> {
        self.complete_probe_at(probe_id, Utc::now())
    }

    /// Finish a probe, estimate tau, and forward the result when it is
    /// trustworthy. The session is released whatever the outcome.
    pub fn complete_probe_at(&mut self, probe_id: &str, now: DateTime<Utc>) -> Option<ProbeResult> {
        let Some(mut session) = self.active.remove(probe_id) else {
            log_debug!("Completion requested for unknown probe {}", probe_id);
            return None;
        };

        let end = session.observation_end(now);
        let duration_secs = (end - session.start_time).num_seconds().max(1) as f64;

        let estimate = match session.start_temp {
            Some(start_temp) => estimate_tau(&session.samples, start_temp, &self.config),
            None => TauEstimate::NONE,
        };

        let result = self.build_result(
            &session.samples,
            estimate,
            duration_secs,
            session.outdoor_temp,
            session.probe_type,
            now,
        );
        session.complete();

        if let (Some(start), Some(last)) = (session.start_temp, session.last_sample()) {
            self.forward_if_accepted(&result, start, last.temperature);
        } else {
            log_info!("Probe {} finished without samples; nothing to learn", probe_id);
        }

        self.remember(result.clone());
        self.dismiss_notification(probe_id);
        log_info!(
            "Completed {} probe {}: tau {:.1} min, confidence {:.2}, {:.0}s",
            result.probe_type.as_str(),
            probe_id,
            result.tau_value,
            result.confidence,
            result.duration
        );
        Some(result)
    }

    /// Passive-window check honouring the `passive_detection_enabled` switch.
    pub fn detect_passive_probe(&self, history: &[HistorySample]) -> bool {
        if !self.config.passive_detection_enabled {
            return false;
        }
        is_passive_window(history, &self.config)
    }

    pub fn complete_passive_probe(&mut self, history: &[HistorySample]) -> Option<ProbeResult> {
        self.complete_passive_probe_at(history, Utc::now())
    }

    /// Turn a qualifying history window into a passive probe result. Returns
    /// `None` when the window does not qualify. Never touches the active table.
    pub fn complete_passive_probe_at(
        &mut self,
        history: &[HistorySample],
        now: DateTime<Utc>,
    ) -> Option<ProbeResult> {
        if !self.detect_passive_probe(history) {
            return None;
        }
        let (first, last) = (history.first()?, history.last()?);

        let samples = indoor_curve(history);
        let estimate = estimate_tau(&samples, first.indoor_temp, &self.config);
        let duration_secs = (last.timestamp - first.timestamp).num_seconds().max(1) as f64;

        let result = self.build_result(
            &samples,
            estimate,
            duration_secs,
            last.outdoor_temp,
            ProbeType::Passive,
            now,
        );
        self.forward_if_accepted(&result, first.indoor_temp, last.indoor_temp);
        self.remember(result.clone());
        log_info!(
            "Passive probe over {:.0}s: tau {:.1} min, confidence {:.2}",
            duration_secs,
            result.tau_value,
            result.confidence
        );
        Some(result)
    }

    fn build_result(
        &self,
        samples: &[TemperatureSample],
        estimate: TauEstimate,
        duration_secs: f64,
        outdoor_temp: Option<f64>,
        probe_type: ProbeType,
        now: DateTime<Utc>,
    ) -> ProbeResult {
        let (confidence, data_adequacy, duration_adequacy) = compute_confidence(
            samples.len(),
            duration_secs,
            estimate.fit_quality,
            &self.config,
        );
        log_debug!(
            "Confidence {:.3} = data {:.2} / duration {:.2} / fit {:.2}",
            confidence,
            data_adequacy,
            duration_adequacy,
            estimate.fit_quality
        );

        ProbeResult {
            tau_value: estimate.tau,
            confidence,
            duration: duration_secs,
            fit_quality: estimate.fit_quality,
            aborted: false,
            timestamp: now,
            outdoor_temp,
            probe_type,
        }
    }

    fn forward_if_accepted(&mut self, result: &ProbeResult, start_temp: f64, final_temp: f64) {
        if result.confidence <= self.config.min_forward_confidence || !result.has_estimate() {
            log_info!(
                "Probe result not forwarded: tau {:.1}, confidence {:.2}",
                result.tau_value,
                result.confidence
            );
            return;
        }

        let is_cooling = final_temp - start_temp < 0.0;
        self.model.update_tau(result, is_cooling);
    }

    fn remember(&mut self, result: ProbeResult) {
        let limit = self.config.max_recent_results.max(1);
        while self.recent_results.len() >= limit {
            self.recent_results.pop_front();
        }
        self.recent_results.push_back(result);
    }

    fn dismiss_notification(&mut self, probe_id: &str) {
        if let Err(err) = self.notifier.dismiss(&notification_id(probe_id)) {
            log_error!("Failed to dismiss notification for probe {}: {}", probe_id, err);
        }
    }
}

fn notification_id(probe_id: &str) -> String {
    format!("thermal_probe_{probe_id}")
}
