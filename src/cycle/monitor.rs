//! HVAC dwell-time guard.
//!
//! Records completed on/off cycles and answers whether the equipment may change
//! state yet. Short average cycles flag the controller for retuning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::CycleConfig;
use crate::{log_debug, log_warn};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    /// Length of the recorded cycle in seconds.
    pub duration: f64,
    pub is_on: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CycleMonitor {
    config: CycleConfig,
    last_on_time: Option<DateTime<Utc>>,
    last_off_time: Option<DateTime<Utc>>,
    history: VecDeque<CycleRecord>,
}

impl Default for CycleMonitor {
    fn default() -> Self {
        Self::new(CycleConfig::default())
    }
}

impl CycleMonitor {
    pub fn new(config: CycleConfig) -> Self {
        let capacity = config.history_capacity.max(1);
        Self {
            config,
            last_on_time: None,
            last_off_time: None,
            history: VecDeque::with_capacity(capacity),
        }
    }

    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    pub fn can_turn_on(&self) -> bool {
        self.can_turn_on_at(Utc::now())
    }

    /// True when no off-event was seen yet, or the HVAC has been off for at
    /// least `min_off_time_secs`.
    pub fn can_turn_on_at(&self, now: DateTime<Utc>) -> bool {
        dwell_satisfied(self.last_off_time, self.config.min_off_time_secs, now)
    }

    pub fn can_turn_off(&self) -> bool {
        self.can_turn_off_at(Utc::now())
    }

    pub fn can_turn_off_at(&self, now: DateTime<Utc>) -> bool {
        dwell_satisfied(self.last_on_time, self.config.min_on_time_secs, now)
    }

    /// Seconds left before `can_turn_on_at` becomes true; 0 when already allowed.
    pub fn time_until_can_turn_on_at(&self, now: DateTime<Utc>) -> f64 {
        remaining_dwell(self.last_off_time, self.config.min_off_time_secs, now)
    }

    pub fn time_until_can_turn_off_at(&self, now: DateTime<Utc>) -> f64 {
        remaining_dwell(self.last_on_time, self.config.min_on_time_secs, now)
    }

    pub fn record_cycle(&mut self, duration: f64, is_on: bool) {
        self.record_cycle_at(duration, is_on, Utc::now());
    }

    /// Record a transition event at `now`. `is_on` marks an on-event (the
    /// HVAC just switched on) versus an off-event; `duration` is the length of
    /// the cycle being closed out.
    pub fn record_cycle_at(&mut self, duration: f64, is_on: bool, now: DateTime<Utc>) {
        if is_on {
            self.last_on_time = Some(now);
        } else {
            self.last_off_time = Some(now);
        }

        if self.history.len() >= self.config.history_capacity.max(1) {
            self.history.pop_front();
        }
        self.history.push_back(CycleRecord {
            duration,
            is_on,
            timestamp: now,
        });

        log_debug!(
            "Recorded {} cycle of {:.0}s ({} in history)",
            if is_on { "on" } else { "off" },
            duration,
            self.history.len()
        );
    }

    /// Mean (on, off) cycle lengths in seconds; either is 0.0 without samples.
    pub fn get_average_cycle_duration(&self) -> (f64, f64) {
        let mut on_total = 0.0;
        let mut on_count = 0usize;
        let mut off_total = 0.0;
        let mut off_count = 0usize;

        for record in &self.history {
            if record.is_on {
                on_total += record.duration;
                on_count += 1;
            } else {
                off_total += record.duration;
                off_count += 1;
            }
        }

        (mean(on_total, on_count), mean(off_total, off_count))
    }

    /// Short-cycling check: either average is positive but under the threshold.
    pub fn needs_adjustment(&self) -> bool {
        if self.history.is_empty() {
            return false;
        }

        let threshold = self.config.short_cycle_threshold_secs;
        let (avg_on, avg_off) = self.get_average_cycle_duration();
        let short_on = avg_on > 0.0 && avg_on < threshold;
        let short_off = avg_off > 0.0 && avg_off < threshold;

        if short_on || short_off {
            log_warn!(
                "Short cycling detected: avg on {:.0}s, avg off {:.0}s (threshold {:.0}s)",
                avg_on,
                avg_off,
                threshold
            );
        }
        short_on || short_off
    }

    pub fn history(&self) -> impl Iterator<Item = &CycleRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear(&mut self) {
        self.history.clear();
        self.last_on_time = None;
        self.last_off_time = None;
    }
}

fn elapsed_secs(since: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (now - since).num_milliseconds() as f64 / 1000.0
}

fn dwell_satisfied(last_event: Option<DateTime<Utc>>, min_secs: u64, now: DateTime<Utc>) -> bool {
    match last_event {
        None => true,
        Some(at) => elapsed_secs(at, now) >= min_secs as f64,
    }
}

fn remaining_dwell(last_event: Option<DateTime<Utc>>, min_secs: u64, now: DateTime<Utc>) -> f64 {
    match last_event {
        None => 0.0,
        Some(at) => (min_secs as f64 - elapsed_secs(at, now)).max(0.0),
    }
}

fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn fresh_monitor_allows_everything() {
        let monitor = CycleMonitor::default();
        assert!(monitor.can_turn_on_at(t0()));
        assert!(monitor.can_turn_off_at(t0()));
        assert!(!monitor.needs_adjustment());
        assert_eq!(monitor.get_average_cycle_duration(), (0.0, 0.0));
    }

    #[test]
    fn off_event_blocks_turn_on_until_min_off_time() {
        let mut monitor = CycleMonitor::default();
        monitor.record_cycle_at(900.0, false, t0());

        assert!(!monitor.can_turn_on_at(t0() + Duration::seconds(599)));
        assert!(monitor.can_turn_on_at(t0() + Duration::seconds(600)));
        // An off-event says nothing about the on dwell.
        assert!(monitor.can_turn_off_at(t0()));
    }

    #[test]
    fn on_event_blocks_turn_off_until_min_on_time() {
        let mut monitor = CycleMonitor::default();
        monitor.record_cycle_at(600.0, true, t0());

        assert!(!monitor.can_turn_off_at(t0() + Duration::seconds(120)));
        assert!(monitor.can_turn_off_at(t0() + Duration::seconds(300)));
        assert_eq!(
            monitor.time_until_can_turn_off_at(t0() + Duration::seconds(120)),
            180.0
        );
        assert_eq!(monitor.time_until_can_turn_on_at(t0()), 0.0);
    }

    #[test]
    fn averages_and_short_cycle_detection() {
        let mut monitor = CycleMonitor::default();
        for duration in [300.0, 400.0, 500.0] {
            monitor.record_cycle_at(duration, true, t0());
        }
        for duration in [600.0, 800.0] {
            monitor.record_cycle_at(duration, false, t0());
        }

        assert_eq!(monitor.get_average_cycle_duration(), (400.0, 700.0));
        assert!(monitor.needs_adjustment());
    }

    #[test]
    fn long_cycles_need_no_adjustment() {
        let mut monitor = CycleMonitor::default();
        monitor.record_cycle_at(900.0, true, t0());
        monitor.record_cycle_at(1200.0, false, t0());
        assert!(!monitor.needs_adjustment());

        // Only one kind of cycle recorded: the empty side averages to 0 and is ignored.
        let mut monitor = CycleMonitor::default();
        monitor.record_cycle_at(1200.0, false, t0());
        assert_eq!(monitor.get_average_cycle_duration(), (0.0, 1200.0));
        assert!(!monitor.needs_adjustment());
    }

    #[test]
    fn history_is_bounded_and_evicts_oldest() {
        let mut monitor = CycleMonitor::default();
        for i in 0..60 {
            monitor.record_cycle_at(i as f64, true, t0() + Duration::seconds(i));
        }
        assert_eq!(monitor.history_len(), 50);
        assert_eq!(monitor.history().next().map(|r| r.duration), Some(10.0));
    }

    #[test]
    fn clear_resets_dwell_tracking() {
        let mut monitor = CycleMonitor::default();
        monitor.record_cycle_at(100.0, false, t0());
        monitor.clear();
        assert!(monitor.can_turn_on_at(t0()));
        assert_eq!(monitor.history_len(), 0);
    }

    proptest! {
        #[test]
        fn turn_on_permitted_iff_off_dwell_elapsed(elapsed in 0i64..2000) {
            let mut monitor = CycleMonitor::default();
            monitor.record_cycle_at(500.0, false, t0());
            let allowed = monitor.can_turn_on_at(t0() + Duration::seconds(elapsed));
            prop_assert_eq!(allowed, elapsed >= 600);
        }

        #[test]
        fn adjustment_matches_average_rule(
            on in proptest::collection::vec(1.0f64..2000.0, 0..10),
            off in proptest::collection::vec(1.0f64..2000.0, 0..10),
        ) {
            let mut monitor = CycleMonitor::default();
            for d in &on {
                monitor.record_cycle_at(*d, true, t0());
            }
            for d in &off {
                monitor.record_cycle_at(*d, false, t0());
            }
            let (avg_on, avg_off) = monitor.get_average_cycle_duration();
            let expected = (avg_on > 0.0 && avg_on < 420.0) || (avg_off > 0.0 && avg_off < 420.0);
            prop_assert_eq!(monitor.needs_adjustment(), expected);
        }
    }
}
