//! One-way delay anomaly detection

/// Outcome of checking one measured delay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayReport {
    /// Receive time minus embedded send time, clock offset included
    pub raw: f64,
    /// `raw` with the calibrated offset removed
    pub adjusted: f64,
    /// Whether `|adjusted|` exceeded the threshold
    pub anomaly: bool,
}

/// Flags samples whose offset-corrected delay is out of bounds
///
/// Only meaningful once the clock offset is calibrated; samples seen during
/// calibration belong to the calibrator. The check is advisory and never
/// affects whether a sample is processed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayMonitor {
    threshold: f64,
}

impl DelayMonitor {
    /// Create a monitor flagging `|adjusted| > threshold`
    pub fn new(threshold: f64) -> Self {
        DelayMonitor { threshold }
    }

    /// Remove `offset` from `raw` and compare against the threshold
    ///
    /// A delay exactly at the threshold is not an anomaly.
    pub fn check(&self, raw: f64, offset: f64) -> DelayReport {
        let adjusted = raw - offset;
        DelayReport {
            raw,
            adjusted,
            anomaly: adjusted.abs() > self.threshold,
        }
    }
}
