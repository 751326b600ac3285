//! Receive, decode and observe one datagram
//!
//! Shared by the relay and the receiver so both observers treat the stream
//! identically.

use crate::report;
use rangelink_io::DatagramLink;
use rangelink_protocol::{Clock, DecodeError, Observation, Sample, StreamMonitor};
use std::thread;
use std::time::Duration;

/// Receive buffer size; larger than a sample so oversized datagrams are
/// rejected by length instead of being truncated into something decodable
pub(crate) const RECV_BUFFER_SIZE: usize = 2048;

/// Pause after a failed receive so a persistently broken link does not spin
pub(crate) const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Why a received datagram went no further
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not a well-formed sample
    Malformed(DecodeError),
    /// Integrity check failed
    Corrupt { expected: u32, actual: u32 },
}

pub(crate) enum Intake {
    /// Nothing arrived before the timeout, or the receive failed
    Idle,
    Dropped(DropReason),
    Accepted {
        len: usize,
        sample: Sample,
        observation: Observation,
    },
}

pub(crate) fn take_one<L, C>(
    link: &L,
    buffer: &mut [u8],
    clock: &C,
    monitor: &mut StreamMonitor,
    path: &str,
) -> Intake
where
    L: DatagramLink,
    C: Clock,
{
    let len = match link.recv(buffer) {
        Ok(Some(len)) => len,
        Ok(None) => return Intake::Idle,
        Err(e) => {
            tracing::warn!("Failed to receive sample on {}, ignoring: {}", path, e);
            thread::sleep(RECV_ERROR_BACKOFF);
            return Intake::Idle;
        }
    };
    let received_at = clock.now();

    let sample = match Sample::decode(&buffer[..len]) {
        Ok(sample) => sample,
        Err(e) => {
            tracing::warn!("Dropping datagram on {}: {}", path, e);
            return Intake::Dropped(DropReason::Malformed(e));
        }
    };
    tracing::debug!("Received sample on {}: {} ({} bytes)", path, sample, len);

    let observation = monitor.observe(&sample, received_at);
    report::log_observation(path, &sample, &observation);

    if let Observation::Corrupt { expected, actual } = observation {
        return Intake::Dropped(DropReason::Corrupt { expected, actual });
    }

    Intake::Accepted {
        len,
        sample,
        observation,
    }
}
