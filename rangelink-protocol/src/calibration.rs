//! Clock offset calibration
//!
//! The receiver measures each Sync sample's apparent one-way delay as
//! `receive time - embedded send time`. With unsynchronized clocks that value
//! is the true transit delay plus the constant clock difference. The median of
//! a fixed, odd-sized burst of such measurements is taken as the offset; a
//! median shrugs off one or two delay spikes that would drag a mean.
//!
//! Once calibrated the calibrator never goes back to calibrating. Under
//! [`CalibrationPolicy::OneShot`] the offset is then fixed for the session, so
//! clock drift accumulates uncorrected. [`CalibrationPolicy::Refresh`] collects
//! later Sync samples into a new window and replaces the offset each time a
//! window fills. A window left partly filled when its burst ends is thrown
//! away rather than topped up from the next burst.

use tracing::debug;

/// Default calibration burst size
pub const DEFAULT_BURST_SIZE: usize = 5;

/// What to do with Sync samples that arrive after calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationPolicy {
    /// Ignore them; the first offset stands for the whole session
    #[default]
    OneShot,
    /// Gather them into another burst and swap in its median when full
    Refresh,
}

/// Calibrator state reported after each submission
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibratorStatus {
    /// Still filling the initial burst
    Calibrating { collected: usize, needed: usize },
    /// Offset in force, in the same unit as the submitted delays
    Calibrated { offset: f64 },
}

impl CalibratorStatus {
    pub fn offset(&self) -> Option<f64> {
        match self {
            CalibratorStatus::Calibrating { .. } => None,
            CalibratorStatus::Calibrated { offset } => Some(*offset),
        }
    }
}

/// Median-of-burst clock offset estimator
#[derive(Debug, Clone)]
pub struct ClockOffsetCalibrator {
    burst_size: usize,
    policy: CalibrationPolicy,
    samples: Vec<f64>,
    offset: Option<f64>,
    recalibrations: u64,
}

impl ClockOffsetCalibrator {
    /// Create a calibrator expecting bursts of `burst_size` delay samples
    ///
    /// # Panics
    /// Panics if `burst_size` is even or zero; the median is the middle element
    /// and there is no interpolation.
    pub fn new(burst_size: usize, policy: CalibrationPolicy) -> Self {
        assert!(
            burst_size % 2 == 1,
            "Calibration burst size {} must be odd",
            burst_size
        );
        ClockOffsetCalibrator {
            burst_size,
            policy,
            samples: Vec::with_capacity(burst_size),
            offset: None,
            recalibrations: 0,
        }
    }

    /// Submit one measured Sync delay
    ///
    /// After calibration a one-shot calibrator ignores the value and reports
    /// the existing offset.
    pub fn submit(&mut self, delay: f64) -> CalibratorStatus {
        if self.offset.is_some() && self.policy == CalibrationPolicy::OneShot {
            return self.status();
        }

        self.samples.push(delay);
        if self.samples.len() == self.burst_size {
            let offset = median(&mut self.samples);
            if let Some(previous) = self.offset.replace(offset) {
                self.recalibrations += 1;
                debug!(
                    "Clock offset refreshed: {:.3} -> {:.3} (refresh #{})",
                    previous, offset, self.recalibrations
                );
            }
            self.samples.clear();
        }

        self.status()
    }

    /// Current state without submitting anything
    pub fn status(&self) -> CalibratorStatus {
        match self.offset {
            Some(offset) => CalibratorStatus::Calibrated { offset },
            None => CalibratorStatus::Calibrating {
                collected: self.samples.len(),
                needed: self.burst_size,
            },
        }
    }

    /// Offset in force, if calibrated
    #[inline]
    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.offset.is_some()
    }

    /// Drop a partly filled refresh window
    ///
    /// Called when the burst that was feeding the window has ended, so a
    /// window cut short by a lost Sync sample is not completed with delays
    /// from the next burst. Returns the number of delays discarded. The
    /// initial calibration burst is never discarded.
    pub fn end_refresh_window(&mut self) -> usize {
        if self.offset.is_none() || self.samples.is_empty() {
            return 0;
        }
        let discarded = self.samples.len();
        debug!(
            "Discarding partial refresh window ({}/{} delays)",
            discarded, self.burst_size
        );
        self.samples.clear();
        discarded
    }

    /// Number of refresh windows completed after the initial calibration
    pub fn recalibrations(&self) -> u64 {
        self.recalibrations
    }
}

/// Sort in place and take the middle element; `values` must be odd-sized
fn median(values: &mut [f64]) -> f64 {
    values.sort_by(f64::total_cmp);
    values[values.len() / 2]
}
