//! Sans-IO server engine.
//!
//! [`ServerDriver`] turns inbound datagrams and clock ticks into
//! [`ServerAction`]s. It owns the [`Store`] and the [`ServerMetrics`] but
//! never touches a socket, so tests feed it bytes and timestamps directly.

use std::net::SocketAddr;

use tracing::{debug, warn};
use tuplespace_proto::{ClientOpcode, ServerMessage};

use crate::{
    config::ServerConfig,
    inbound::{Inbound, classify},
    metrics::ServerMetrics,
    store::{ResendPolicy, ServerAction, Store},
};

/// Request dispatcher with metrics.
#[derive(Debug)]
pub struct ServerDriver {
    store: Store,
    metrics: ServerMetrics,
}

impl ServerDriver {
    /// Empty store with the resend policy from `config`.
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            store: Store::new(ResendPolicy::new(config.resend_interval, config.max_resends)),
            metrics: ServerMetrics::default(),
        }
    }

    /// Store state, for inspection.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Counters so far.
    pub fn metrics(&self) -> &ServerMetrics {
        &self.metrics
    }

    /// Count a transport failure.
    pub fn record_transport_error(&mut self) {
        self.metrics.errors += 1;
    }

    /// Handle one datagram from `from`.
    pub fn process_datagram(
        &mut self,
        from: SocketAddr,
        bytes: &[u8],
        now_ms: u64,
    ) -> Vec<ServerAction> {
        self.metrics.received_messages += 1;

        let actions = match classify(bytes) {
            Inbound::Out { tuple } => {
                debug!(%from, arity = tuple.arity(), "out");
                self.metrics.out_requests += 1;
                self.metrics.received_arity_total += tuple.arity() as u64;
                self.store.out(from, tuple, now_ms)
            },
            Inbound::Get { template, operation } => {
                debug!(%from, %operation, arity = template.arity(), "get");
                self.metrics.record_get(operation);
                self.metrics.received_arity_total += template.arity() as u64;
                // A retransmitted queued request is not a new miss.
                let retransmit = self.store.is_queued_request(from, &template, operation);
                let actions = self.store.get(from, template, operation, now_ms);
                if !retransmit && is_miss(&actions, from) {
                    self.metrics.record_miss(operation);
                }
                actions
            },
            Inbound::Ack => self.store.ack(from),
            Inbound::SerializationIssue { opcode, error } => {
                warn!(%from, ?opcode, %error, "serialization issue");
                self.metrics.serialization_issues += 1;
                Vec::new()
            },
            Inbound::InvalidInvariant { opcode } => {
                warn!(%from, ?opcode, "request violates tuple invariant");
                match opcode {
                    ClientOpcode::SendTuple => self.metrics.invalid_send_requests += 1,
                    ClientOpcode::GetTuple | ClientOpcode::Received => {
                        self.metrics.invalid_get_requests += 1;
                    },
                }
                Vec::new()
            },
            Inbound::Malformed { error } => {
                warn!(%from, %error, "malformed datagram");
                self.metrics.errors += 1;
                Vec::new()
            },
        };

        self.observe(&actions);
        actions
    }

    /// Run the resend sweep.
    pub fn tick(&mut self, now_ms: u64) -> Vec<ServerAction> {
        let actions = self.store.sweep(now_ms);
        self.observe(&actions);
        actions
    }

    fn observe(&mut self, actions: &[ServerAction]) {
        for action in actions {
            match action {
                ServerAction::Send { message, .. } => {
                    self.metrics.sent_messages += 1;
                    if let ServerMessage::Tuple(tuple) = message {
                        self.metrics.sent_tuples += 1;
                        self.metrics.sent_arity_total += tuple.arity() as u64;
                    }
                },
                ServerAction::Abandoned { .. } => self.metrics.abandoned_deliveries += 1,
            }
        }
        self.metrics.currently_stashed = self.store.stashed() as u64;
        self.metrics.currently_queued = self.store.queued() as u64;
    }
}

/// The first response to the requester is a keep-alive or a refusal.
fn is_miss(actions: &[ServerAction], requester: SocketAddr) -> bool {
    actions.iter().any(|action| {
        matches!(
            action,
            ServerAction::Send {
                to,
                message: ServerMessage::AwaitingTuple | ServerMessage::LackOfTuple,
            } if *to == requester
        )
    })
}
