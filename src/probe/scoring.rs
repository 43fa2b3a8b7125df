use crate::config::ProbeConfig;

/// Weighted confidence of a probe result.
///
/// Returns `(confidence, data_adequacy, duration_adequacy)`.
pub fn compute_confidence(
    sample_count: usize,
    duration_secs: f64,
    fit_quality: f64,
    config: &ProbeConfig,
) -> (f64, f64, f64) {
    let data_adequacy = score_data(sample_count, config);
    let duration_adequacy = score_duration(duration_secs, config);

    let confidence = config.weight_data * data_adequacy
        + config.weight_duration * duration_adequacy
        + config.weight_fit * fit_quality.clamp(0.0, 1.0);

    (confidence.clamp(0.0, 1.0), data_adequacy, duration_adequacy)
}

/// Saturates once `data_adequacy_samples` readings are in.
fn score_data(sample_count: usize, config: &ProbeConfig) -> f64 {
    (sample_count as f64 / config.data_adequacy_samples.max(1) as f64).min(1.0)
}

fn score_duration(duration_secs: f64, config: &ProbeConfig) -> f64 {
    if config.duration_adequacy_secs <= 0.0 {
        return 1.0;
    }
    (duration_secs.max(0.0) / config.duration_adequacy_secs).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_combine_linearly() {
        let (confidence, data, duration) =
            compute_confidence(4, 900.0, 0.4, &ProbeConfig::default());
        assert!((data - 0.2).abs() < 1e-9);
        assert!((duration - 0.5).abs() < 1e-9);
        assert!((confidence - 0.35).abs() < 1e-9);
    }

    #[test]
    fn everything_saturates_at_one() {
        let (confidence, _, _) = compute_confidence(200, 10_000.0, 1.0, &ProbeConfig::default());
        assert!((confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn nothing_scores_zero() {
        let (confidence, _, _) = compute_confidence(0, 0.0, 0.0, &ProbeConfig::default());
        assert_eq!(confidence, 0.0);
    }
}
