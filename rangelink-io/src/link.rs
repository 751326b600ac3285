//! Datagram links
//!
//! A link is one direction-agnostic datagram pipe as a role sees it: it can
//! send to a fixed peer and receive with a bounded wait. Roles are written
//! against [`DatagramLink`] so the same loop runs over real UDP sockets or over
//! the in-process [`MemoryLink`] used by deterministic tests.

use crate::socket::{SocketError, TelemetrySocket};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::net::SocketAddr;
use std::time::Duration;

/// One endpoint of a datagram pipe
pub trait DatagramLink {
    /// Send one datagram to the link's peer
    fn send(&self, datagram: &[u8]) -> Result<usize, SocketError>;

    /// Receive one datagram into `buf`, waiting at most the link's timeout
    ///
    /// Returns `Ok(None)` when the wait expires. Datagrams larger than `buf`
    /// are truncated, as with UDP.
    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, SocketError>;
}

impl<L: DatagramLink + ?Sized> DatagramLink for &L {
    fn send(&self, datagram: &[u8]) -> Result<usize, SocketError> {
        (**self).send(datagram)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, SocketError> {
        (**self).recv(buf)
    }
}

impl<L: DatagramLink + ?Sized> DatagramLink for Box<L> {
    fn send(&self, datagram: &[u8]) -> Result<usize, SocketError> {
        (**self).send(datagram)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, SocketError> {
        (**self).recv(buf)
    }
}

/// Link over a UDP socket
///
/// An inbound link has no peer and only receives; an outbound link sends to a
/// fixed destination.
#[derive(Debug)]
pub struct UdpLink {
    socket: TelemetrySocket,
    peer: Option<SocketAddr>,
}

impl UdpLink {
    /// Receive-only link over a bound socket
    pub fn inbound(socket: TelemetrySocket) -> Self {
        UdpLink { socket, peer: None }
    }

    /// Link sending to `peer`
    pub fn outbound(socket: TelemetrySocket, peer: SocketAddr) -> Self {
        UdpLink {
            socket,
            peer: Some(peer),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, SocketError> {
        self.socket.local_addr()
    }
}

impl DatagramLink for UdpLink {
    fn send(&self, datagram: &[u8]) -> Result<usize, SocketError> {
        let peer = self.peer.ok_or(SocketError::NoPeer)?;
        self.socket.send_to(datagram, peer)
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, SocketError> {
        match self.socket.recv_from(buf)? {
            Some((n, from)) => {
                tracing::trace!("Received {} bytes from {}", n, from);
                Ok(Some(n))
            }
            None => Ok(None),
        }
    }
}

/// In-process link backed by unbounded channels
///
/// Delivery is lossless and ordered; tests model a lossy network by choosing
/// what to send.
#[derive(Debug, Clone)]
pub struct MemoryLink {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    timeout: Duration,
}

impl MemoryLink {
    /// Create two connected endpoints; each receives what the other sends
    pub fn pair(timeout: Duration) -> (MemoryLink, MemoryLink) {
        let (a_tx, b_rx) = channel::unbounded();
        let (b_tx, a_rx) = channel::unbounded();
        (
            MemoryLink {
                tx: a_tx,
                rx: a_rx,
                timeout,
            },
            MemoryLink {
                tx: b_tx,
                rx: b_rx,
                timeout,
            },
        )
    }

    /// Datagrams waiting to be received on this endpoint
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl DatagramLink for MemoryLink {
    fn send(&self, datagram: &[u8]) -> Result<usize, SocketError> {
        self.tx
            .send(datagram.to_vec())
            .map_err(|_| SocketError::Disconnected)?;
        Ok(datagram.len())
    }

    fn recv(&self, buf: &mut [u8]) -> Result<Option<usize>, SocketError> {
        match self.rx.recv_timeout(self.timeout) {
            Ok(datagram) => {
                let n = datagram.len().min(buf.len());
                buf[..n].copy_from_slice(&datagram[..n]);
                Ok(Some(n))
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(SocketError::Disconnected),
        }
    }
}
