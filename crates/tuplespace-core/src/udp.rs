//! UDP transport over `std::net::UdpSocket`.
//!
//! [`UdpTransport`] owns only byte I/O. Receives are non-blocking by default;
//! a poll timeout turns them into short blocking waits so an idle loop does
//! not spin a core.

use std::{
    io,
    net::{SocketAddr, UdpSocket},
    time::Duration,
};

use tracing::debug;

use crate::{clock::MonotonicClock, error::TransportError, transport::Transport};

/// Datagram transport over a bound UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
    clock: MonotonicClock,
}

impl UdpTransport {
    /// Bind to `addr` in non-blocking mode.
    ///
    /// Passing port 0 lets the OS choose an ephemeral port; see
    /// [`UdpTransport::local_addr`].
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;
        debug!(%local_addr, "udp transport bound");
        Ok(Self { socket: Some(socket), local_addr, clock: MonotonicClock::new() })
    }

    /// Wait up to `timeout` in each [`Transport::recv`] call.
    ///
    /// A zero timeout keeps the socket fully non-blocking.
    pub fn with_poll_timeout(self, timeout: Duration) -> Result<Self, TransportError> {
        let socket = self.socket()?;
        if timeout.is_zero() {
            socket.set_nonblocking(true)?;
        } else {
            socket.set_nonblocking(false)?;
            socket.set_read_timeout(Some(timeout))?;
        }
        Ok(self)
    }

    /// Address the socket is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    fn socket(&self) -> Result<&UdpSocket, TransportError> {
        self.socket.as_ref().ok_or(TransportError::Closed)
    }
}

impl Transport for UdpTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<(SocketAddr, usize)>, TransportError> {
        match self.socket()?.recv_from(buf) {
            Ok((len, from)) => Ok(Some((from, len))),
            Err(e) if is_idle(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn send(&mut self, to: SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        self.socket()?.send_to(payload, to)?;
        Ok(())
    }

    fn clock_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn teardown(&mut self) {
        if self.socket.take().is_some() {
            debug!(local_addr = %self.local_addr, "udp transport closed");
        }
    }
}

/// Errors that only mean "nothing to read yet".
///
/// `ConnectionReset` shows up on some platforms after an ICMP port
/// unreachable for an earlier send; the socket stays usable.
fn is_idle(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::ConnectionReset
    )
}
