//! Stream monitoring pipeline
//!
//! Composes sequence tracking, clock offset calibration and delay checking the
//! same way for every observer of the stream, whether it is the terminal
//! receiver or a relay watching traffic pass through.

use crate::calibration::{CalibrationPolicy, CalibratorStatus, ClockOffsetCalibrator};
use crate::delay::{DelayMonitor, DelayReport};
use crate::sample::{Sample, SampleKind};
use crate::sequence::{GapReport, SequenceTracker, TrackerStats};
use crate::time::WallTime;

/// Default delay threshold in milliseconds
pub const DEFAULT_MAX_DELAY_MS: f64 = 0.2;

/// Monitor parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Calibration burst size (odd)
    pub burst_size: usize,
    /// Post-calibration Sync handling
    pub policy: CalibrationPolicy,
    /// Delay anomaly threshold in milliseconds
    pub max_delay_ms: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            burst_size: crate::calibration::DEFAULT_BURST_SIZE,
            policy: CalibrationPolicy::OneShot,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
        }
    }
}

/// What the monitor made of one sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    /// Integrity check failed; the sample went no further
    Corrupt { expected: u32, actual: u32 },
    /// Sample fed the initial calibration burst
    Calibrating {
        kind: SampleKind,
        gap: Option<GapReport>,
        delay_ms: f64,
        collected: usize,
        needed: usize,
    },
    /// Sample completed the initial calibration burst
    Calibrated {
        kind: SampleKind,
        gap: Option<GapReport>,
        delay_ms: f64,
        offset: f64,
    },
    /// Sync sample after calibration
    Sync { delay_ms: f64, offset: f64 },
    /// Data sample checked against the calibrated offset
    Data {
        sequence: u32,
        gap: GapReport,
        delay: DelayReport,
    },
}

impl Observation {
    /// Sequence report, for data samples
    pub fn gap(&self) -> Option<GapReport> {
        match self {
            Observation::Calibrating { gap, .. } | Observation::Calibrated { gap, .. } => *gap,
            Observation::Data { gap, .. } => Some(*gap),
            Observation::Corrupt { .. } | Observation::Sync { .. } => None,
        }
    }

    /// Check if the delay monitor flagged this sample
    pub fn is_high_delay(&self) -> bool {
        matches!(self, Observation::Data { delay, .. } if delay.anomaly)
    }

    /// Check if this observation warrants an operator's attention
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Observation::Corrupt { .. })
            || self.is_high_delay()
            || self.gap().map_or(false, |g| g.is_gap())
    }
}

/// Session counters for the shutdown summary
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MonitorSummary {
    pub tracker: TrackerStats,
    pub sync_samples: u64,
    pub corrupt: u64,
    pub delay_checks: u64,
    pub delay_anomalies: u64,
    pub max_adjusted_delay_ms: Option<f64>,
    pub offset_ms: Option<f64>,
    pub recalibrations: u64,
}

/// Sequence, calibration and delay pipeline for one stream
#[derive(Debug, Clone)]
pub struct StreamMonitor {
    tracker: SequenceTracker,
    calibrator: ClockOffsetCalibrator,
    delay: DelayMonitor,
    summary: MonitorSummary,
}

impl StreamMonitor {
    /// Create a monitor
    ///
    /// # Panics
    /// Panics if `config.burst_size` is even.
    pub fn new(config: MonitorConfig) -> Self {
        StreamMonitor {
            tracker: SequenceTracker::new(),
            calibrator: ClockOffsetCalibrator::new(config.burst_size, config.policy),
            delay: DelayMonitor::new(config.max_delay_ms),
            summary: MonitorSummary::default(),
        }
    }

    /// Observe a decoded sample received at `received_at`
    pub fn observe(&mut self, sample: &Sample, received_at: WallTime) -> Observation {
        if !sample.is_valid() {
            self.summary.corrupt += 1;
            return Observation::Corrupt {
                expected: sample.expected_integrity(),
                actual: sample.integrity,
            };
        }

        let delay_ms = received_at.millis_since(sample.send_time);
        let gap = if sample.is_data() {
            Some(self.tracker.observe(sample.sequence))
        } else {
            self.summary.sync_samples += 1;
            None
        };

        if !self.calibrator.is_calibrated() {
            return match self.calibrator.submit(delay_ms) {
                CalibratorStatus::Calibrating { collected, needed } => Observation::Calibrating {
                    kind: sample.kind,
                    gap,
                    delay_ms,
                    collected,
                    needed,
                },
                CalibratorStatus::Calibrated { offset } => Observation::Calibrated {
                    kind: sample.kind,
                    gap,
                    delay_ms,
                    offset,
                },
            };
        }

        match gap {
            None => {
                let offset = self.calibrator.submit(delay_ms).offset().unwrap_or_default();
                Observation::Sync { delay_ms, offset }
            }
            Some(gap) => {
                // Data resuming ends the resync burst
                self.calibrator.end_refresh_window();
                let offset = self.calibrator.offset().unwrap_or_default();
                let delay = self.delay.check(delay_ms, offset);
                self.record_delay(&delay);
                Observation::Data {
                    sequence: sample.sequence,
                    gap,
                    delay,
                }
            }
        }
    }

    fn record_delay(&mut self, delay: &DelayReport) {
        self.summary.delay_checks += 1;
        if delay.anomaly {
            self.summary.delay_anomalies += 1;
        }
        let magnitude = delay.adjusted.abs();
        self.summary.max_adjusted_delay_ms = Some(
            self.summary
                .max_adjusted_delay_ms
                .map_or(magnitude, |max| max.max(magnitude)),
        );
    }

    /// Calibration state without submitting anything
    pub fn calibration(&self) -> CalibratorStatus {
        self.calibrator.status()
    }

    /// Session counters so far
    pub fn summary(&self) -> MonitorSummary {
        MonitorSummary {
            tracker: self.tracker.stats(),
            offset_ms: self.calibrator.offset(),
            recalibrations: self.calibrator.recalibrations(),
            ..self.summary
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::IntegrityScheme;

    const SCHEME: IntegrityScheme = IntegrityScheme::Xor;

    fn config() -> MonitorConfig {
        MonitorConfig {
            burst_size: 3,
            policy: CalibrationPolicy::OneShot,
            max_delay_ms: 5.0,
        }
    }

    fn sent(ms: i64) -> WallTime {
        WallTime::from_micros(1_700_000_000_000_000 + ms as i128 * 1_000)
    }

    #[test]
    fn test_calibrates_from_sync_burst() {
        let mut monitor = StreamMonitor::new(config());
        let delays = [100, 102, 101];

        for (i, d) in delays.iter().enumerate() {
            let sample = Sample::sync(sent(i as i64), SCHEME);
            let obs = monitor.observe(&sample, sent(i as i64 + d));
            if i < 2 {
                assert!(matches!(obs, Observation::Calibrating { collected, .. } if collected == i + 1));
            } else {
                assert_eq!(
                    obs,
                    Observation::Calibrated {
                        kind: SampleKind::Sync,
                        gap: None,
                        delay_ms: 101.0,
                        offset: 101.0
                    }
                );
            }
        }
    }

    #[test]
    fn test_data_checked_after_calibration() {
        let mut monitor = StreamMonitor::new(config());
        for i in 0..3 {
            monitor.observe(&Sample::sync(sent(i), SCHEME), sent(i + 50));
        }

        let ok = monitor.observe(&Sample::data(0, 100, sent(10), SCHEME), sent(62));
        assert!(matches!(
            ok,
            Observation::Data { sequence: 0, gap: GapReport::First, delay } if delay.adjusted == 2.0 && !delay.anomaly
        ));

        let slow = monitor.observe(&Sample::data(1, 100, sent(20), SCHEME), sent(80));
        assert!(slow.is_high_delay());
        assert!(slow.is_anomaly());

        let summary = monitor.summary();
        assert_eq!(summary.delay_checks, 2);
        assert_eq!(summary.delay_anomalies, 1);
        assert_eq!(summary.offset_ms, Some(50.0));
        assert_eq!(summary.max_adjusted_delay_ms, Some(10.0));
    }

    #[test]
    fn test_data_during_calibration_feeds_calibrator() {
        let mut monitor = StreamMonitor::new(config());
        monitor.observe(&Sample::sync(sent(0), SCHEME), sent(10));
        monitor.observe(&Sample::sync(sent(1), SCHEME), sent(11));

        let obs = monitor.observe(&Sample::data(0, 100, sent(2), SCHEME), sent(12));
        assert_eq!(
            obs,
            Observation::Calibrated {
                kind: SampleKind::Data,
                gap: Some(GapReport::First),
                delay_ms: 10.0,
                offset: 10.0
            }
        );
        assert_eq!(monitor.summary().delay_checks, 0);
    }

    #[test]
    fn test_corrupt_sample_goes_no_further() {
        let mut monitor = StreamMonitor::new(config());
        let mut sample = Sample::data(3, 100, sent(0), SCHEME);
        sample.distance = 99;

        let obs = monitor.observe(&sample, sent(1));
        assert_eq!(
            obs,
            Observation::Corrupt {
                expected: 3 ^ 99,
                actual: 3 ^ 100
            }
        );
        assert!(obs.is_anomaly());

        let summary = monitor.summary();
        assert_eq!(summary.corrupt, 1);
        assert_eq!(summary.tracker.observed, 0);
        assert!(matches!(
            monitor.calibration(),
            CalibratorStatus::Calibrating { collected: 0, .. }
        ));
    }

    #[test]
    fn test_sync_after_calibration_reports_offset() {
        let mut monitor = StreamMonitor::new(config());
        for i in 0..3 {
            monitor.observe(&Sample::sync(sent(i), SCHEME), sent(i + 7));
        }
        let obs = monitor.observe(&Sample::sync(sent(9), SCHEME), sent(30));
        assert_eq!(
            obs,
            Observation::Sync {
                delay_ms: 21.0,
                offset: 7.0
            }
        );
        assert!(!obs.is_anomaly());
        assert_eq!(monitor.summary().sync_samples, 4);
    }

    #[test]
    fn test_short_resync_burst_does_not_straddle() {
        let mut monitor = StreamMonitor::new(MonitorConfig {
            policy: CalibrationPolicy::Refresh,
            ..config()
        });
        for i in 0..3 {
            monitor.observe(&Sample::sync(sent(i), SCHEME), sent(i + 10));
        }
        monitor.observe(&Sample::data(0, 100, sent(5), SCHEME), sent(15));

        // resync burst loses its last Sync, then Data resumes
        monitor.observe(&Sample::sync(sent(6), SCHEME), sent(16));
        monitor.observe(&Sample::sync(sent(7), SCHEME), sent(17));
        monitor.observe(&Sample::data(1, 100, sent(8), SCHEME), sent(18));

        // receiver clock stepped 30ms forward before the next burst
        for i in 9..12 {
            monitor.observe(&Sample::sync(sent(i), SCHEME), sent(i + 40));
        }

        let summary = monitor.summary();
        assert_eq!(summary.offset_ms, Some(40.0));
        assert_eq!(summary.recalibrations, 1);
    }

    #[test]
    fn test_gap_is_anomaly() {
        let mut monitor = StreamMonitor::new(config());
        for i in 0..3 {
            monitor.observe(&Sample::sync(sent(i), SCHEME), sent(i));
        }
        monitor.observe(&Sample::data(0, 1, sent(5), SCHEME), sent(5));
        let obs = monitor.observe(&Sample::data(2, 1, sent(6), SCHEME), sent(6));
        assert_eq!(
            obs.gap(),
            Some(GapReport::Loss {
                from: 0,
                to: 2,
                missing: 1
            })
        );
        assert!(obs.is_anomaly());
        assert!(!obs.is_high_delay());
    }
}
