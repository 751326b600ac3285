//! Sample stream generation for the sending side
//!
//! A session opens with a burst of Sync samples whose only useful field is the
//! send time, then continues with Data samples numbered from zero. With a
//! resync interval configured, another Sync burst follows every that many Data
//! samples so observers running a refresh policy can track clock drift.

use crate::calibration::DEFAULT_BURST_SIZE;
use crate::sample::{IntegrityScheme, Sample};
use crate::time::WallTime;

/// Produces the ordered sample stream
#[derive(Debug, Clone)]
pub struct SampleGenerator {
    burst_size: usize,
    scheme: IntegrityScheme,
    resync_every: Option<u32>,
    /// Sync samples still owed in the current burst
    sync_remaining: usize,
    /// Data samples since the last burst
    since_burst: u32,
    next_sequence: u32,
    emitted: u64,
}

impl SampleGenerator {
    /// Create a generator opening with `burst_size` Sync samples
    pub fn new(burst_size: usize, scheme: IntegrityScheme) -> Self {
        SampleGenerator {
            burst_size,
            scheme,
            resync_every: None,
            sync_remaining: burst_size,
            since_burst: 0,
            next_sequence: 0,
            emitted: 0,
        }
    }

    /// Emit a fresh Sync burst after every `every` Data samples
    ///
    /// `None` or `Some(0)` keeps the single opening burst.
    pub fn with_resync_every(mut self, every: Option<u32>) -> Self {
        self.resync_every = every.filter(|&n| n > 0);
        self
    }

    /// Build the next sample in the stream, stamped with `send_time`
    ///
    /// `distance` is ignored for Sync samples.
    pub fn next_sample(&mut self, distance: u32, send_time: WallTime) -> Sample {
        if self.sync_remaining == 0 {
            if let Some(every) = self.resync_every {
                if self.since_burst >= every {
                    self.sync_remaining = self.burst_size;
                    self.since_burst = 0;
                }
            }
        }

        self.emitted += 1;
        if self.sync_remaining > 0 {
            self.sync_remaining -= 1;
            return Sample::sync(send_time, self.scheme);
        }

        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.since_burst = self.since_burst.saturating_add(1);
        Sample::data(sequence, distance, send_time, self.scheme)
    }

    /// Check if the next sample will be a Sync sample
    pub fn in_burst(&self) -> bool {
        self.sync_remaining > 0
            || self
                .resync_every
                .map_or(false, |every| self.since_burst >= every)
    }

    /// Sequence number the next Data sample will carry
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Samples produced so far, Sync and Data
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn scheme(&self) -> IntegrityScheme {
        self.scheme
    }
}

impl Default for SampleGenerator {
    fn default() -> Self {
        SampleGenerator::new(DEFAULT_BURST_SIZE, IntegrityScheme::Xor)
    }
}
