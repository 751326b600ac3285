//! Sender role: emit the sample stream at a fixed cadence
//!
//! Cadence is a plain sleep between sends. Scheduling jitter is neither
//! measured nor compensated.

use crate::shutdown::ShutdownToken;
use rangelink_io::DatagramLink;
use rangelink_protocol::{Clock, Sample, SampleGenerator};
use std::thread;
use std::time::Duration;

/// Source of distance readings for Data samples
pub trait DistanceSource {
    fn read(&mut self) -> u32;
}

/// Sensor stand-in reporting the same reading forever
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantDistance(pub u32);

impl DistanceSource for ConstantDistance {
    fn read(&mut self) -> u32 {
        self.0
    }
}

impl<F: FnMut() -> u32> DistanceSource for F {
    fn read(&mut self) -> u32 {
        self()
    }
}

/// Result of one send attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(Sample),
    /// The send failed and the sample is gone; its sequence number is not reused
    Failed(Sample),
}

/// Sender counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub sync_sent: u64,
    pub data_sent: u64,
    pub send_failures: u64,
}

/// Drives a [`SampleGenerator`] onto a link
pub struct SampleSender<L, C, D> {
    link: L,
    clock: C,
    distance: D,
    generator: SampleGenerator,
    interval: Duration,
    stats: SenderStats,
}

impl<L, C, D> SampleSender<L, C, D>
where
    L: DatagramLink,
    C: Clock,
    D: DistanceSource,
{
    pub fn new(
        link: L,
        clock: C,
        distance: D,
        generator: SampleGenerator,
        interval: Duration,
    ) -> Self {
        SampleSender {
            link,
            clock,
            distance,
            generator,
            interval,
            stats: SenderStats::default(),
        }
    }

    /// Build, stamp and send the next sample
    pub fn send_once(&mut self) -> SendOutcome {
        let distance = if self.generator.in_burst() {
            0
        } else {
            self.distance.read()
        };
        let sample = self.generator.next_sample(distance, self.clock.now());

        match self.link.send(&sample.encode()) {
            Ok(n) => {
                if sample.is_sync() {
                    self.stats.sync_sent += 1;
                } else {
                    self.stats.data_sent += 1;
                }
                tracing::debug!("Sent sample: {} ({} bytes)", sample, n);
                SendOutcome::Sent(sample)
            }
            Err(e) => {
                self.stats.send_failures += 1;
                tracing::warn!("Failed to send sample, ignoring: {}", e);
                SendOutcome::Failed(sample)
            }
        }
    }

    /// Send one sample per interval until `token` is cancelled
    pub fn run(&mut self, token: &ShutdownToken) -> SenderStats {
        tracing::info!(
            "Sending one sample every {:?}, opening with a calibration burst",
            self.interval
        );

        while !token.is_cancelled() {
            self.send_once();
            thread::sleep(self.interval);
        }

        tracing::info!(
            "Sender exiting: {} sync / {} data samples sent, {} send failures",
            self.stats.sync_sent,
            self.stats.data_sent,
            self.stats.send_failures
        );
        self.stats
    }

    pub fn stats(&self) -> SenderStats {
        self.stats
    }

    pub fn generator(&self) -> &SampleGenerator {
        &self.generator
    }
}
