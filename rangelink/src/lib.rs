//! rangelink - distance telemetry over UDP
//!
//! High-level Rust API for the telemetry path: sample wire format, stream
//! monitoring (sequence gaps, clock offset calibration, delay anomalies) and
//! the datagram links the sender, relay and receiver roles run over.

pub use rangelink_io as io;
pub use rangelink_protocol as protocol;

// Re-export commonly used types
pub use io::{DatagramLink, MemoryLink, UdpLink};
pub use protocol::{Observation, Sample, SampleKind, StreamMonitor, WallTime};
