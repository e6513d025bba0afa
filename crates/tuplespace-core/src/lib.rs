//! Tuple space transport core
//!
//! The client and server protocol engines never touch sockets directly. They
//! are generic over [`Transport`], a small capability interface: send a
//! datagram, receive a datagram without blocking indefinitely, read a
//! monotonic millisecond clock, and tear down.
//!
//! # Components
//!
//! - [`transport`]: The [`Transport`] trait
//! - [`udp`]: [`UdpTransport`], the production implementation
//! - [`clock`]: Monotonic millisecond clock used by [`UdpTransport`]
//! - [`error`]: Transport error type
//!
//! Tests and simulations supply their own [`Transport`] with a virtual clock,
//! so retry and resend timing can be exercised without sleeping.

pub mod clock;
pub mod error;
pub mod transport;
pub mod udp;

pub use clock::MonotonicClock;
pub use error::TransportError;
pub use transport::Transport;
pub use udp::UdpTransport;
