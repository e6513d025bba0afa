//! Transport abstraction for datagram protocols.
//!
//! Models the four capabilities a device must offer: unreliable datagram
//! send and receive, a monotonic clock, and teardown. Production uses
//! [`crate::UdpTransport`]; tests use an in-memory network with a virtual
//! clock.

use std::net::SocketAddr;

use crate::error::TransportError;

/// Datagram transport driven by a single-threaded event loop.
///
/// Datagrams may be lost, duplicated or reordered. Implementations never
/// block indefinitely in [`Transport::recv`]; the protocol engines poll it
/// against their own deadlines.
pub trait Transport {
    /// Receive one datagram into `buf`.
    ///
    /// Returns `Ok(None)` when nothing is available right now. A datagram
    /// larger than `buf` is truncated to `buf.len()` bytes.
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<(SocketAddr, usize)>, TransportError>;

    /// Send one datagram to `to`.
    fn send(&mut self, to: SocketAddr, payload: &[u8]) -> Result<(), TransportError>;

    /// Monotonic time in milliseconds.
    fn clock_ms(&self) -> u64;

    /// Whether [`Transport::recv`] reports real sender addresses.
    ///
    /// Devices that cannot identify the sender skip the server address check
    /// on the client.
    fn can_identify_sender(&self) -> bool {
        true
    }

    /// Release the underlying resources. Later calls fail with
    /// [`TransportError::Closed`].
    fn teardown(&mut self);
}
