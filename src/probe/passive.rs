//! Opportunistic (passive) probe detection.
//!
//! A stretch of history qualifies when the HVAC stayed off for the whole
//! window, the outdoor temperature held steady, and the indoor temperature
//! still drifted far enough to fit a curve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ProbeConfig;
use crate::models::HvacMode;

use super::session::TemperatureSample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub hvac_mode: HvacMode,
    pub timestamp: DateTime<Utc>,
    pub indoor_temp: f64,
    pub outdoor_temp: Option<f64>,
}

/// Pure predicate over an ordered history window. Ignores the
/// `passive_detection_enabled` switch; [`super::ProbeManager`] applies it.
pub fn is_passive_window(history: &[HistorySample], config: &ProbeConfig) -> bool {
    let (first, last) = match (history.first(), history.last()) {
        (Some(first), Some(last)) if history.len() >= 2 => (first, last),
        _ => return false,
    };

    let span_minutes = (last.timestamp - first.timestamp).num_milliseconds() as f64 / 60_000.0;
    if span_minutes < config.passive_min_span_minutes {
        return false;
    }

    if !history.iter().all(|s| s.hvac_mode.is_off()) {
        return false;
    }

    let Some(outdoor_range) = outdoor_range(history) else {
        return false;
    };
    if outdoor_range > config.passive_max_outdoor_range {
        return false;
    }

    if !first.indoor_temp.is_finite() || !last.indoor_temp.is_finite() {
        return false;
    }
    let indoor_drift = (last.indoor_temp - first.indoor_temp).abs();
    indoor_drift >= config.passive_min_indoor_drift
}

/// Max minus min outdoor temperature; `None` when any sample lacks a usable reading.
fn outdoor_range(history: &[HistorySample]) -> Option<f64> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for sample in history {
        let outdoor = sample.outdoor_temp.filter(|t| t.is_finite())?;
        min = min.min(outdoor);
        max = max.max(outdoor);
    }
    Some(max - min)
}

pub(crate) fn indoor_curve(history: &[HistorySample]) -> Vec<TemperatureSample> {
    history
        .iter()
        .map(|s| TemperatureSample {
            timestamp: s.timestamp,
            temperature: s.indoor_temp,
        })
        .collect()
}
