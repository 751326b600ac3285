//! Relay role: forward samples while observing them
//!
//! Every well-formed sample with a valid checksum is forwarded byte-for-byte,
//! whatever the monitor thinks of its sequence number or delay. Only
//! malformed or corrupt datagrams are held back.

use crate::intake::{self, DropReason, Intake, RECV_BUFFER_SIZE};
use crate::report;
use crate::shutdown::ShutdownToken;
use rangelink_io::DatagramLink;
use rangelink_protocol::{Clock, MonitorConfig, MonitorSummary, Observation, StreamMonitor};
use std::time::Instant;

const INBOUND_PATH: &str = "sender -> relay";

/// Outcome of one relay iteration
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardResult {
    /// Nothing to forward this time around
    Idle,
    /// Received but not forwarded
    Dropped(DropReason),
    /// Observed and forwarded
    Forwarded(Observation),
    /// Observed, but the outbound send failed
    SendFailed(Observation),
}

/// Relay counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub forwarded: u64,
    pub dropped: u64,
    pub send_failures: u64,
}

/// Pass-through observer between an inbound and an outbound link
pub struct RelayForwarder<I, O, C> {
    // Fields drop in declaration order: outbound first, then inbound.
    outbound: O,
    inbound: I,
    clock: C,
    monitor: StreamMonitor,
    buffer: Vec<u8>,
    stats: RelayStats,
}

impl<I, O, C> RelayForwarder<I, O, C>
where
    I: DatagramLink,
    O: DatagramLink,
    C: Clock,
{
    /// Create a relay
    ///
    /// # Panics
    /// Panics if `config.burst_size` is even.
    pub fn new(inbound: I, outbound: O, clock: C, config: MonitorConfig) -> Self {
        RelayForwarder {
            outbound,
            inbound,
            clock,
            monitor: StreamMonitor::new(config),
            buffer: vec![0u8; RECV_BUFFER_SIZE],
            stats: RelayStats::default(),
        }
    }

    /// Receive at most one sample and forward it
    ///
    /// Blocks for up to the inbound link's timeout.
    pub fn relay_once(&mut self) -> ForwardResult {
        let (len, observation) = match intake::take_one(
            &self.inbound,
            &mut self.buffer,
            &self.clock,
            &mut self.monitor,
            INBOUND_PATH,
        ) {
            Intake::Idle => return ForwardResult::Idle,
            Intake::Dropped(reason) => {
                self.stats.dropped += 1;
                return ForwardResult::Dropped(reason);
            }
            Intake::Accepted {
                len, observation, ..
            } => (len, observation),
        };

        match self.outbound.send(&self.buffer[..len]) {
            Ok(_) => {
                self.stats.forwarded += 1;
                ForwardResult::Forwarded(observation)
            }
            Err(e) => {
                tracing::warn!("Failed to forward sample to receiver, ignoring: {}", e);
                self.stats.send_failures += 1;
                ForwardResult::SendFailed(observation)
            }
        }
    }

    /// Relay until `token` is cancelled
    pub fn run(&mut self, token: &ShutdownToken) -> RelayStats {
        let started = Instant::now();
        tracing::info!("Relay ready to forward samples...");

        while !token.is_cancelled() {
            self.relay_once();
        }

        tracing::info!(
            "Relay shutting down: {} forwarded, {} dropped, {} send failures",
            self.stats.forwarded,
            self.stats.dropped,
            self.stats.send_failures
        );
        report::log_monitor_summary("Relay", &self.monitor.summary(), started.elapsed());
        self.stats
    }

    pub fn stats(&self) -> RelayStats {
        self.stats
    }

    pub fn summary(&self) -> MonitorSummary {
        self.monitor.summary()
    }
}
