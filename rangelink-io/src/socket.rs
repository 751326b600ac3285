//! UDP socket wrapper for telemetry roles
//!
//! Sockets are blocking with a bounded receive timeout. The timeout is what
//! keeps a role's loop turning over when no traffic arrives, so it can notice
//! a shutdown request; an expired receive is therefore reported as `Ok(None)`
//! rather than an error.

use socket2::{Domain, Protocol, Socket, Type};
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use thiserror::Error;

/// Socket errors
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No destination configured for this link")]
    NoPeer,

    #[error("Link peer disconnected")]
    Disconnected,
}

/// Blocking UDP socket with optional timeouts
#[derive(Debug)]
pub struct TelemetrySocket {
    inner: UdpSocket,
}

impl TelemetrySocket {
    /// Create a socket bound to the given address
    ///
    /// Port 0 lets the OS pick one, which is what a sending-only socket wants.
    /// The address is bound exclusively: binding a port another socket holds
    /// fails.
    pub fn bind(addr: SocketAddr) -> Result<Self, SocketError> {
        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        socket.bind(&addr.into())?;

        Ok(TelemetrySocket {
            inner: socket.into(),
        })
    }

    /// Bound receive calls by `timeout`
    pub fn set_read_timeout(&self, timeout: Duration) -> Result<(), SocketError> {
        self.inner.set_read_timeout(Some(timeout))?;
        Ok(())
    }

    /// Bound send calls by `timeout`
    pub fn set_write_timeout(&self, timeout: Duration) -> Result<(), SocketError> {
        self.inner.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    /// Builder form of [`TelemetrySocket::set_read_timeout`]
    pub fn with_read_timeout(self, timeout: Duration) -> Result<Self, SocketError> {
        self.set_read_timeout(timeout)?;
        Ok(self)
    }

    /// Builder form of [`TelemetrySocket::set_write_timeout`]
    pub fn with_write_timeout(self, timeout: Duration) -> Result<Self, SocketError> {
        self.set_write_timeout(timeout)?;
        Ok(self)
    }

    /// Get the local address this socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        Ok(self.inner.local_addr()?)
    }

    /// Send one datagram to the given address
    pub fn send_to(&self, buf: &[u8], target: SocketAddr) -> Result<usize, SocketError> {
        Ok(self.inner.send_to(buf, target)?)
    }

    /// Receive one datagram
    ///
    /// Returns `Ok(None)` when the read timeout expires with nothing received.
    pub fn recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>, SocketError> {
        match self.inner.recv_from(buf) {
            Ok(received) => Ok(Some(received)),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(SocketError::Io(e)),
        }
    }
}

/// Receive timeouts surface as `WouldBlock` on Unix and `TimedOut` on Windows
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
}
