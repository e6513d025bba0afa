//! In-memory datagram network.
//!
//! Every bound address owns a FIFO inbox. The network keeps one virtual
//! clock that advances by `tick_ms` on every receive poll, so protocol
//! deadlines pass as fast as the engines poll. Loss and duplication are
//! drawn from a seeded ChaCha RNG; the same seed replays the same run.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    rc::Rc,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;
use tuplespace_core::{Transport, TransportError};

/// Fault injection rates, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NetworkFaults {
    /// Probability that a datagram is dropped
    pub loss_rate: f64,
    /// Probability that a delivered datagram is delivered twice
    pub duplicate_rate: f64,
}

/// Counters for everything the network did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkStats {
    /// Datagrams handed to `send`
    pub sent: u64,
    /// Datagrams dropped by fault injection or sent to unbound addresses
    pub dropped: u64,
    /// Extra copies queued by fault injection
    pub duplicated: u64,
    /// Datagrams handed out by `recv`
    pub delivered: u64,
}

#[derive(Debug)]
struct NetState {
    now_ms: u64,
    tick_ms: u64,
    inboxes: HashMap<SocketAddr, VecDeque<(SocketAddr, Vec<u8>)>>,
    rng: ChaCha8Rng,
    faults: NetworkFaults,
    stats: NetworkStats,
}

impl NetState {
    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.r#gen::<f64>() < rate
    }
}

/// Shared handle to one simulated network.
#[derive(Debug, Clone)]
pub struct SimNetwork {
    state: Rc<RefCell<NetState>>,
}

impl SimNetwork {
    /// Lossless network.
    pub fn new(seed: u64) -> Self {
        Self::with_faults(seed, NetworkFaults::default())
    }

    /// Network with fault injection.
    pub fn with_faults(seed: u64, faults: NetworkFaults) -> Self {
        let state = NetState {
            now_ms: 0,
            tick_ms: 1,
            inboxes: HashMap::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            faults,
            stats: NetworkStats::default(),
        };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Attach a transport at `addr`. Rebinding an address clears its inbox.
    pub fn bind(&self, addr: SocketAddr) -> SimTransport {
        self.state.borrow_mut().inboxes.insert(addr, VecDeque::new());
        SimTransport { network: self.clone(), addr, closed: false }
    }

    /// Virtual time in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Move the clock forward without polling.
    pub fn advance(&self, ms: u64) {
        let mut state = self.state.borrow_mut();
        state.now_ms = state.now_ms.saturating_add(ms);
    }

    /// Clock advance per receive poll.
    pub fn set_tick(&self, tick_ms: u64) {
        self.state.borrow_mut().tick_ms = tick_ms;
    }

    /// Replace the fault rates.
    pub fn set_faults(&self, faults: NetworkFaults) {
        self.state.borrow_mut().faults = faults;
    }

    /// Counters so far.
    pub fn stats(&self) -> NetworkStats {
        self.state.borrow().stats
    }

    /// Datagrams waiting for `addr`.
    pub fn pending(&self, addr: SocketAddr) -> usize {
        self.state.borrow().inboxes.get(&addr).map_or(0, VecDeque::len)
    }

    fn send(&self, from: SocketAddr, to: SocketAddr, payload: &[u8]) {
        let mut state = self.state.borrow_mut();
        state.stats.sent += 1;

        let loss_rate = state.faults.loss_rate;
        let duplicate_rate = state.faults.duplicate_rate;
        if state.roll(loss_rate) || !state.inboxes.contains_key(&to) {
            trace!(%from, %to, len = payload.len(), "datagram dropped");
            state.stats.dropped += 1;
            return;
        }
        let copies = if state.roll(duplicate_rate) {
            state.stats.duplicated += 1;
            2
        } else {
            1
        };
        if let Some(inbox) = state.inboxes.get_mut(&to) {
            for _ in 0..copies {
                inbox.push_back((from, payload.to_vec()));
            }
        }
    }

    fn recv(&self, addr: SocketAddr, buf: &mut [u8]) -> Option<(SocketAddr, usize)> {
        let mut state = self.state.borrow_mut();
        state.now_ms = state.now_ms.saturating_add(state.tick_ms);
        let (from, payload) = state.inboxes.get_mut(&addr)?.pop_front()?;
        state.stats.delivered += 1;

        let len = payload.len().min(buf.len());
        buf[..len].copy_from_slice(&payload[..len]);
        Some((from, len))
    }

    fn unbind(&self, addr: SocketAddr) {
        self.state.borrow_mut().inboxes.remove(&addr);
    }
}

/// Endpoint on a [`SimNetwork`].
#[derive(Debug)]
pub struct SimTransport {
    network: SimNetwork,
    addr: SocketAddr,
    closed: bool,
}

impl SimTransport {
    /// Bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Network this endpoint is attached to.
    pub fn network(&self) -> &SimNetwork {
        &self.network
    }
}

impl Transport for SimTransport {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<(SocketAddr, usize)>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        Ok(self.network.recv(self.addr, buf))
    }

    fn send(&mut self, to: SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.network.send(self.addr, to, payload);
        Ok(())
    }

    fn clock_ms(&self) -> u64 {
        self.network.now_ms()
    }

    fn teardown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.network.unbind(self.addr);
        }
    }
}
