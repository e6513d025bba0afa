//! Client side of the request/acknowledge exchange.
//!
//! # Reliable send (`out`)
//!
//! Send, then wait `ack_await` for the server's acknowledgment. On timeout
//! send again, up to `max_repeats` sends in total (0 means no limit). With a
//! zero `ack_await` the first send is the whole exchange.
//!
//! # Request (`in`, `inp`, `rd`, `rdp`)
//!
//! ```text
//!          send                   tuple / lack
//!  Idle ─────────> AwaitingResponse ─────────────> Done ──ack──> return
//!   ^                 │      ^
//!   │ timeout,        │ awaiting: one extra attempt
//!   │ budget left     v      │
//!   └──────────── GotKeepAlive
//! ```
//!
//! A keep-alive proves the request is queued, so it adds one attempt to the
//! budget instead of using one up. A definitive answer is acknowledged before
//! it is returned; the acknowledgment waits for the server's own ack and is
//! retried within the same budget, but its failure does not fail the call.
//!
//! Blocking requests are never refused by the server. A "lack of tuple" seen
//! during `in` or `rd` is a late resend for an earlier `inp`/`rdp` and is
//! dropped without an acknowledgment.

use std::net::SocketAddr;

use tracing::{debug, warn};
use tuplespace_core::{Transport, clock::duration_ms};
use tuplespace_proto::{
    ClientMessage, MAX_DATAGRAM_SIZE, Operation, ProtocolError, ServerMessage, Tuple, TupleSpan,
    message::{encode_get_tuple, encode_send_tuple},
};

use crate::{config::ClientConfig, error::ClientError};

/// Datagrams discarded before a new request at most.
const MAX_STALE_DRAIN: usize = 64;

/// Definitive answer to a template request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Matched tuple, connection id still first
    Tuple(Tuple),
    /// Nothing matched a non-blocking request
    LackOfTuple,
}

/// One polled datagram, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    /// Nothing waiting
    Nothing,
    /// Tuple from the server
    Tuple(Tuple),
    /// "Lack of tuple" from the server
    LackOfTuple,
    /// Keep-alive from the server
    AwaitingTuple,
    /// Acknowledgment from the server
    Ack,
    /// Datagram from an address other than the server
    UnknownSender(SocketAddr),
    /// Datagram from the server that does not decode
    Malformed(ProtocolError),
}

/// Remaining sends; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RetryBudget {
    remaining: Option<u32>,
}

impl RetryBudget {
    fn new(max_repeats: u32) -> Self {
        Self { remaining: (max_repeats > 0).then_some(max_repeats) }
    }

    /// Spend the attempt that just timed out. Returns whether another send
    /// is allowed.
    fn consume(&mut self) -> bool {
        match &mut self.remaining {
            None => true,
            Some(n) => {
                *n = n.saturating_sub(1);
                *n > 0
            },
        }
    }

    fn extend(&mut self) {
        if let Some(n) = &mut self.remaining {
            *n = n.saturating_add(1);
        }
    }
}

#[derive(Debug)]
enum RequestState {
    Idle,
    AwaitingResponse { deadline_ms: u64 },
    GotKeepAlive { deadline_ms: u64 },
    Done(Response),
}

/// Protocol engine over a transport.
#[derive(Debug)]
pub struct ProtocolClient<T: Transport> {
    transport: T,
    config: ClientConfig,
    recv_buf: [u8; MAX_DATAGRAM_SIZE],
}

impl<T: Transport> ProtocolClient<T> {
    /// Wrap `transport`.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self { transport, config, recv_buf: [0; MAX_DATAGRAM_SIZE] }
    }

    /// Active configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tear down the transport.
    pub fn close(&mut self) {
        self.transport.teardown();
    }

    /// Deposit a data tuple with the reliable-send protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] if the tuple does not fit a datagram,
    /// [`ClientError::Transport`] on a socket failure and
    /// [`ClientError::RetriesExhausted`] if no acknowledgment arrives within
    /// the retry budget.
    pub fn send_tuple(&mut self, tuple: &TupleSpan<'_>) -> Result<(), ClientError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = encode_send_tuple(tuple, &mut buf)?;
        self.drain_stale()?;
        self.reliable_send(&buf[..len])
    }

    /// Run a template request until a definitive response arrives.
    ///
    /// Keep-alives extend the retry budget. The definitive response is
    /// acknowledged before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Encode`] if the template does not fit a
    /// datagram, [`ClientError::Transport`] on a socket failure and
    /// [`ClientError::RetriesExhausted`] if the budget runs out first.
    pub fn get_tuple(
        &mut self,
        template: &TupleSpan<'_>,
        operation: Operation,
    ) -> Result<Response, ClientError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        let len = encode_get_tuple(template, operation, &mut buf)?;
        self.drain_stale()?;

        let request = &buf[..len];
        let await_ms = duration_ms(self.config.ack_await);
        let mut budget = RetryBudget::new(self.config.max_repeats);
        let mut attempts = 0u32;
        let mut state = RequestState::Idle;

        loop {
            state = match state {
                RequestState::Idle => {
                    self.transport.send(self.config.server, request)?;
                    attempts += 1;
                    debug!(%operation, attempt = attempts, "request sent");
                    RequestState::AwaitingResponse {
                        deadline_ms: self.transport.clock_ms().saturating_add(await_ms),
                    }
                },
                RequestState::AwaitingResponse { deadline_ms }
                | RequestState::GotKeepAlive { deadline_ms } => match self.receive()? {
                    Incoming::Tuple(tuple) => RequestState::Done(Response::Tuple(tuple)),
                    // A blocking request is never refused, so this answers an
                    // earlier non-blocking exchange. It is not acknowledged.
                    Incoming::LackOfTuple if operation.is_blocking() => {
                        debug!(%operation, "ignoring stale lack of tuple");
                        state
                    },
                    Incoming::LackOfTuple => RequestState::Done(Response::LackOfTuple),
                    Incoming::AwaitingTuple => {
                        debug!(%operation, "request queued by server");
                        budget.extend();
                        RequestState::GotKeepAlive { deadline_ms }
                    },
                    _ if self.transport.clock_ms() < deadline_ms => state,
                    _ if budget.consume() => {
                        debug!(%operation, attempt = attempts, "no response, resending");
                        RequestState::Idle
                    },
                    _ => return Err(ClientError::RetriesExhausted { attempts }),
                },
                RequestState::Done(response) => {
                    self.acknowledge()?;
                    return Ok(response);
                },
            };
        }
    }

    /// Poll one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the socket fails. Undecodable or
    /// foreign datagrams are reported as [`Incoming`] values, not errors.
    pub fn receive(&mut self) -> Result<Incoming, ClientError> {
        let Some((from, len)) = self.transport.recv(&mut self.recv_buf)? else {
            return Ok(Incoming::Nothing);
        };
        if self.transport.can_identify_sender() && from != self.config.server {
            debug!(%from, "ignoring datagram from unknown sender");
            return Ok(Incoming::UnknownSender(from));
        }

        let bytes = &self.recv_buf[..len.min(MAX_DATAGRAM_SIZE)];
        Ok(match ServerMessage::decode(bytes) {
            Ok(ServerMessage::Tuple(tuple)) => Incoming::Tuple(tuple),
            Ok(ServerMessage::LackOfTuple) => Incoming::LackOfTuple,
            Ok(ServerMessage::AwaitingTuple) => Incoming::AwaitingTuple,
            Ok(ServerMessage::Received) => Incoming::Ack,
            Err(error) => {
                warn!(%error, "ignoring malformed server datagram");
                Incoming::Malformed(error)
            },
        })
    }

    fn reliable_send(&mut self, datagram: &[u8]) -> Result<(), ClientError> {
        let await_ms = duration_ms(self.config.ack_await);
        let mut budget = RetryBudget::new(self.config.max_repeats);
        let mut attempts = 0u32;

        loop {
            self.transport.send(self.config.server, datagram)?;
            attempts += 1;
            if await_ms == 0 {
                return Ok(());
            }
            if self.wait_for_ack(await_ms)? {
                return Ok(());
            }
            if !budget.consume() {
                return Err(ClientError::RetriesExhausted { attempts });
            }
            debug!(attempt = attempts, "no acknowledgment, resending");
        }
    }

    /// Acknowledge a definitive response and wait for the server's ack.
    fn acknowledge(&mut self) -> Result<(), ClientError> {
        let mut buf = [0u8; 1];
        let len = ClientMessage::Received.encode_into(&mut buf)?;
        let await_ms = duration_ms(self.config.ack_await);
        let mut budget = RetryBudget::new(self.config.max_repeats);

        loop {
            if let Err(error) = self.transport.send(self.config.server, &buf[..len]) {
                warn!(%error, "cannot send acknowledgment");
                return Ok(());
            }
            match self.wait_for_ack(await_ms) {
                Ok(true) => return Ok(()),
                Ok(false) => {},
                Err(error) => {
                    warn!(%error, "acknowledgment exchange failed");
                    return Ok(());
                },
            }
            if !budget.consume() {
                warn!("server never confirmed acknowledgment");
                return Ok(());
            }
        }
    }

    /// Poll until an ack arrives or `await_ms` passes. Polls at least once.
    fn wait_for_ack(&mut self, await_ms: u64) -> Result<bool, ClientError> {
        let deadline_ms = self.transport.clock_ms().saturating_add(await_ms);
        loop {
            if self.receive()? == Incoming::Ack {
                return Ok(true);
            }
            if self.transport.clock_ms() >= deadline_ms {
                return Ok(false);
            }
        }
    }

    /// Discard late datagrams from an earlier exchange.
    fn drain_stale(&mut self) -> Result<(), ClientError> {
        for _ in 0..MAX_STALE_DRAIN {
            if self.transport.recv(&mut self.recv_buf)?.is_none() {
                break;
            }
            debug!("discarded stale datagram");
        }
        Ok(())
    }
}
