//! Receiver role: terminal consumer of the sample stream

use crate::intake::{self, DropReason, Intake, RECV_BUFFER_SIZE};
use crate::report;
use crate::shutdown::ShutdownToken;
use rangelink_io::DatagramLink;
use rangelink_protocol::{Clock, MonitorConfig, MonitorSummary, Observation, Sample, StreamMonitor};
use std::time::Instant;

/// Outcome of one receive iteration
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiveResult {
    Idle,
    Dropped(DropReason),
    Observed(Sample, Observation),
}

/// Observes the stream arriving on one link
pub struct Receiver<L, C> {
    link: L,
    clock: C,
    monitor: StreamMonitor,
    buffer: Vec<u8>,
    path: String,
}

impl<L, C> Receiver<L, C>
where
    L: DatagramLink,
    C: Clock,
{
    /// Create a receiver
    ///
    /// `upstream` names the peer for log lines, e.g. `relay`.
    ///
    /// # Panics
    /// Panics if `config.burst_size` is even.
    pub fn new(link: L, clock: C, config: MonitorConfig, upstream: &str) -> Self {
        Receiver {
            link,
            clock,
            monitor: StreamMonitor::new(config),
            buffer: vec![0u8; RECV_BUFFER_SIZE],
            path: format!("{} -> receiver", upstream),
        }
    }

    /// Receive and observe at most one sample
    ///
    /// Blocks for up to the link's timeout.
    pub fn receive_once(&mut self) -> ReceiveResult {
        match intake::take_one(
            &self.link,
            &mut self.buffer,
            &self.clock,
            &mut self.monitor,
            &self.path,
        ) {
            Intake::Idle => ReceiveResult::Idle,
            Intake::Dropped(reason) => ReceiveResult::Dropped(reason),
            Intake::Accepted {
                sample,
                observation,
                ..
            } => ReceiveResult::Observed(sample, observation),
        }
    }

    /// Receive until `token` is cancelled
    pub fn run(&mut self, token: &ShutdownToken) -> MonitorSummary {
        let started = Instant::now();
        tracing::info!("Receiver ready for samples...");

        while !token.is_cancelled() {
            self.receive_once();
        }

        let summary = self.monitor.summary();
        tracing::info!("Receiver exiting");
        report::log_monitor_summary("Receiver", &summary, started.elapsed());
        summary
    }

    pub fn summary(&self) -> MonitorSummary {
        self.monitor.summary()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::RECV_ERROR_BACKOFF;
    use rangelink_io::MemoryLink;
    use rangelink_protocol::{CalibratorStatus, IntegrityScheme, ManualClock, WallTime};
    use std::time::Duration;

    #[test]
    fn test_receive_once() {
        let (tx, rx) = MemoryLink::pair(Duration::from_millis(5));
        let sender_clock = ManualClock::new(WallTime::new(1_700_000_000, 0));
        let receiver_clock = sender_clock.skewed(3_000);
        let mut receiver = Receiver::new(rx, receiver_clock, MonitorConfig::default(), "sender");

        assert_eq!(receiver.receive_once(), ReceiveResult::Idle);

        let sample = Sample::sync(sender_clock.now(), IntegrityScheme::Xor);
        tx.send(&sample.encode()).unwrap();
        match receiver.receive_once() {
            ReceiveResult::Observed(received, Observation::Calibrating { delay_ms, .. }) => {
                assert_eq!(received, sample);
                assert_eq!(delay_ms, 3.0);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            receiver.monitor.calibration(),
            CalibratorStatus::Calibrating { collected: 1, .. }
        ));
    }

    #[test]
    fn test_link_error_is_idle() {
        let (tx, rx) = MemoryLink::pair(Duration::from_millis(5));
        let mut receiver =
            Receiver::new(rx, ManualClock::new(WallTime::EPOCH), MonitorConfig::default(), "relay");
        drop(tx);

        let started = Instant::now();
        assert_eq!(receiver.receive_once(), ReceiveResult::Idle);
        assert!(started.elapsed() >= RECV_ERROR_BACKOFF);

        let summary = receiver.summary();
        assert_eq!(summary.sync_samples, 0);
        assert_eq!(summary.corrupt, 0);
        assert_eq!(summary.tracker.observed, 0);
        assert!(matches!(
            receiver.monitor.calibration(),
            CalibratorStatus::Calibrating { collected: 0, .. }
        ));
    }

    #[test]
    fn test_oversized_datagram_dropped() {
        let (tx, rx) = MemoryLink::pair(Duration::from_millis(5));
        let clock = ManualClock::new(WallTime::EPOCH);
        let mut receiver = Receiver::new(rx, clock.clone(), MonitorConfig::default(), "sender");

        let mut bytes = Sample::sync(clock.now(), IntegrityScheme::Xor).encode().to_vec();
        bytes.extend_from_slice(&[0u8; 10]);
        tx.send(&bytes).unwrap();

        assert!(matches!(
            receiver.receive_once(),
            ReceiveResult::Dropped(DropReason::Malformed(_))
        ));
    }
}
