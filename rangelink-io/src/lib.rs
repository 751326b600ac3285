//! rangelink I/O
//!
//! This crate provides the network side of the telemetry roles: a blocking UDP
//! socket wrapper with bounded receive waits, and the datagram link
//! abstraction the roles are written against.

pub mod link;
pub mod socket;

pub use link::{DatagramLink, MemoryLink, UdpLink};
pub use socket::{SocketError, TelemetrySocket};
