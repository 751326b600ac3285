//! rangelink Protocol Core Implementation
//!
//! This crate implements the telemetry sample wire format and the analysis
//! applied to the sample stream: wraparound-aware sequence tracking, clock
//! offset calibration from a burst of Sync samples, and delay anomaly
//! detection. It performs no I/O.

pub mod calibration;
pub mod delay;
pub mod generator;
pub mod monitor;
pub mod sample;
pub mod sequence;
pub mod time;

pub use calibration::{CalibrationPolicy, CalibratorStatus, ClockOffsetCalibrator};
pub use delay::{DelayMonitor, DelayReport};
pub use generator::SampleGenerator;
pub use monitor::{MonitorConfig, MonitorSummary, Observation, StreamMonitor};
pub use sample::{checksum, DecodeError, IntegrityScheme, Sample, SampleKind, SAMPLE_SIZE};
pub use sequence::{GapReport, SequenceTracker, TrackerStats};
pub use time::{Clock, ManualClock, SystemClock, WallTime};
