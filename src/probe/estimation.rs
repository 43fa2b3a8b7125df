//! Tau estimation from a single drift curve.
//!
//! An exponential approach covers `1 - e^-1` (about 63.2%) of its total change
//! after one time constant, so the time at which the curve crosses that
//! fraction of its observed drift is the tau estimate. Curves that never land
//! near the crossing fall back to a linear rate.

use crate::config::ProbeConfig;

use super::session::TemperatureSample;

/// Fraction of the total change reached after one time constant.
pub const ONE_TAU_FRACTION: f64 = 0.632;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TauEstimate {
    /// Minutes; 0.0 when nothing could be estimated.
    pub tau: f64,
    pub fit_quality: f64,
}

impl TauEstimate {
    pub const NONE: TauEstimate = TauEstimate {
        tau: 0.0,
        fit_quality: 0.0,
    };
}

pub fn estimate_tau(
    samples: &[TemperatureSample],
    start_temp: f64,
    config: &ProbeConfig,
) -> TauEstimate {
    let (first, last) = match (samples.first(), samples.last()) {
        (Some(first), Some(last)) if samples.len() >= 2 => (first, last),
        _ => return TauEstimate::NONE,
    };

    let final_temp = last.temperature;
    let target = start_temp + ONE_TAU_FRACTION * (final_temp - start_temp);

    let nearest = samples
        .iter()
        .map(|s| (s, (s.temperature - target).abs()))
        .fold(None::<(&TemperatureSample, f64)>, |best, candidate| match best {
            Some(b) if b.1 <= candidate.1 => Some(b),
            _ => Some(candidate),
        });

    if let Some((sample, distance)) = nearest {
        if distance <= config.tau_match_tolerance {
            let tau = minutes_between(first, sample);
            let fit_quality =
                (samples.len() as f64 / config.full_quality_samples.max(1) as f64).min(1.0);
            return TauEstimate { tau, fit_quality };
        }
    }

    if samples.len() >= 3 {
        let temp_span = (final_temp - start_temp).abs();
        if temp_span > f64::EPSILON {
            // (hours / |dT|) * 60, i.e. minutes per degree of drift
            let tau = minutes_between(first, last) / temp_span;
            return TauEstimate {
                tau,
                fit_quality: config.linear_fallback_quality,
            };
        }
    }

    TauEstimate::NONE
}

fn minutes_between(from: &TemperatureSample, to: &TemperatureSample) -> f64 {
    (to.timestamp - from.timestamp).num_milliseconds() as f64 / 60_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    fn curve(points: &[(i64, f64)]) -> Vec<TemperatureSample> {
        let t0 = DateTime::parse_from_rfc3339("2024-01-15T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        points
            .iter()
            .map(|(minutes, temperature)| TemperatureSample {
                timestamp: t0 + Duration::minutes(*minutes),
                temperature: *temperature,
            })
            .collect()
    }

    #[test]
    fn picks_sample_nearest_one_tau_crossing() {
        let samples = curve(&[(0, 22.0), (5, 22.3), (10, 22.7), (15, 23.1)]);
        let estimate = estimate_tau(&samples, 22.0, &ProbeConfig::default());
        assert!((estimate.tau - 10.0).abs() < 1e-9);
        assert!((estimate.fit_quality - 0.4).abs() < 1e-9);
    }

    #[test]
    fn cooling_curve_uses_same_rule() {
        let samples = curve(&[(0, 24.0), (10, 23.0), (20, 22.5), (30, 22.2), (40, 22.0)]);
        // target = 24 - 0.632 * 2 = 22.736; nearest is 22.5 at 20 min (0.236 away > 0.2)
        // so the linear fallback applies: 40 min / 2 degC
        let estimate = estimate_tau(&samples, 24.0, &ProbeConfig::default());
        assert!((estimate.tau - 20.0).abs() < 1e-9);
        assert_eq!(estimate.fit_quality, 0.6);
    }

    #[test]
    fn fit_quality_saturates_at_ten_samples() {
        let points: Vec<(i64, f64)> = (0..12).map(|i| (i * 5, 20.0 + i as f64 * 0.1)).collect();
        let estimate = estimate_tau(&curve(&points), 20.0, &ProbeConfig::default());
        assert_eq!(estimate.fit_quality, 1.0);
        assert!(estimate.tau > 0.0);
    }

    #[test]
    fn two_samples_far_from_target_yield_nothing() {
        let samples = curve(&[(0, 20.0), (30, 22.0)]);
        assert_eq!(
            estimate_tau(&samples, 20.0, &ProbeConfig::default()),
            TauEstimate::NONE
        );
    }

    #[test]
    fn too_few_samples_yield_nothing() {
        assert_eq!(estimate_tau(&[], 20.0, &ProbeConfig::default()), TauEstimate::NONE);
        let one = curve(&[(0, 20.0)]);
        assert_eq!(estimate_tau(&one, 20.0, &ProbeConfig::default()), TauEstimate::NONE);
    }

    #[test]
    fn flat_curve_matches_first_sample() {
        let samples = curve(&[(0, 20.0), (10, 20.0), (20, 20.0)]);
        let estimate = estimate_tau(&samples, 20.0, &ProbeConfig::default());
        assert_eq!(estimate.tau, 0.0);
    }
}
