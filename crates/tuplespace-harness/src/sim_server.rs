//! Server stepping driven by client polls.

use std::{cell::RefCell, net::SocketAddr, rc::Rc};

use tracing::warn;
use tuplespace_core::{Transport, TransportError};
use tuplespace_server::{Server, ServerConfig};

use crate::sim_network::{SimNetwork, SimTransport};

/// Server handle shared by every client transport in a simulation.
pub type SharedServer = Rc<RefCell<Server<SimTransport>>>;

/// Upper bound on server steps per client poll.
const MAX_STEPS_PER_POLL: usize = 64;

/// Bind a server at `addr` on `network`.
pub fn create_shared_server(
    network: &SimNetwork,
    addr: SocketAddr,
    config: &ServerConfig,
) -> SharedServer {
    Rc::new(RefCell::new(Server::new(network.bind(addr), config)))
}

/// Datagram released into the network at a set virtual time.
#[derive(Debug)]
struct Scheduled {
    at_ms: u64,
    from: SimTransport,
    to: SocketAddr,
    payload: Vec<u8>,
}

/// Client transport that runs the server before every receive.
///
/// Also fires scheduled datagrams from other endpoints once their time has
/// come, which lets a test play a second client while the first one blocks.
#[derive(Debug)]
pub struct ServedTransport {
    transport: SimTransport,
    server: SharedServer,
    scheduled: Vec<Scheduled>,
}

impl ServedTransport {
    /// Wrap `transport`; every poll steps `server` first.
    pub fn new(transport: SimTransport, server: SharedServer) -> Self {
        Self { transport, server, scheduled: Vec::new() }
    }

    /// Send `payload` from `from` to `to` once the clock reaches `at_ms`.
    pub fn schedule(&mut self, at_ms: u64, from: SimTransport, to: SocketAddr, payload: Vec<u8>) {
        self.scheduled.push(Scheduled { at_ms, from, to, payload });
    }

    /// Scheduled datagrams not yet released.
    pub fn pending_scheduled(&self) -> usize {
        self.scheduled.len()
    }

    /// Underlying endpoint.
    pub fn inner(&self) -> &SimTransport {
        &self.transport
    }

    fn fire_due(&mut self) {
        let now = self.transport.clock_ms();
        let (due, later): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.scheduled).into_iter().partition(|s| s.at_ms <= now);
        self.scheduled = later;
        for mut scheduled in due {
            if let Err(error) = scheduled.from.send(scheduled.to, &scheduled.payload) {
                warn!(%error, "scheduled datagram not sent");
            }
        }
    }

    fn pump(&mut self) {
        self.fire_due();
        let mut server = self.server.borrow_mut();
        for _ in 0..MAX_STEPS_PER_POLL {
            match server.step() {
                Ok(true) => {},
                Ok(false) => break,
                Err(error) => {
                    warn!(%error, "server step failed");
                    break;
                },
            }
        }
    }
}

impl Transport for ServedTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<(SocketAddr, usize)>, TransportError> {
        self.pump();
        self.transport.recv(buf)
    }

    fn send(&mut self, to: SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        self.transport.send(to, payload)
    }

    fn clock_ms(&self) -> u64 {
        self.transport.clock_ms()
    }

    fn teardown(&mut self) {
        self.transport.teardown();
    }
}
