//! Server counters.
//!
//! Plain integers updated by the driver on every datagram. The event loop
//! logs a snapshot at a fixed interval; nothing is exported.

use tracing::info;
use tuplespace_proto::Operation;

/// Running totals since server start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerMetrics {
    /// Datagrams received
    pub received_messages: u64,
    /// Datagrams sent
    pub sent_messages: u64,
    /// `out` requests
    pub out_requests: u64,
    /// `in` requests
    pub in_requests: u64,
    /// `inp` requests
    pub inp_requests: u64,
    /// `rd` requests
    pub rd_requests: u64,
    /// `rdp` requests
    pub rdp_requests: u64,
    /// `inp` requests answered with "lack of tuple"
    pub rejected_inp: u64,
    /// `rdp` requests answered with "lack of tuple"
    pub rejected_rdp: u64,
    /// `in` requests that had to wait in the queue
    pub queued_in: u64,
    /// `rd` requests that had to wait in the queue
    pub queued_rd: u64,
    /// Tuples in the stash right now
    pub currently_stashed: u64,
    /// Requests in the queue right now
    pub currently_queued: u64,
    /// Sum of arities of received tuples and templates
    pub received_arity_total: u64,
    /// Tuple responses sent, resends included
    pub sent_tuples: u64,
    /// Sum of arities of sent tuples
    pub sent_arity_total: u64,
    /// Datagrams whose field stream failed to decode
    pub serialization_issues: u64,
    /// `GET_TUPLE` requests without a wildcard
    pub invalid_get_requests: u64,
    /// `SEND_TUPLE` requests with a wildcard
    pub invalid_send_requests: u64,
    /// Malformed datagrams and transport failures
    pub errors: u64,
    /// Tuple deliveries that hit the resend limit
    pub abandoned_deliveries: u64,
}

impl ServerMetrics {
    /// Count one request of `operation`.
    pub fn record_get(&mut self, operation: Operation) {
        match operation {
            Operation::In => self.in_requests += 1,
            Operation::Inp => self.inp_requests += 1,
            Operation::Rd => self.rd_requests += 1,
            Operation::Rdp => self.rdp_requests += 1,
        }
    }

    /// Count a request that missed the stash.
    pub fn record_miss(&mut self, operation: Operation) {
        match operation {
            Operation::In => self.queued_in += 1,
            Operation::Inp => self.rejected_inp += 1,
            Operation::Rd => self.queued_rd += 1,
            Operation::Rdp => self.rejected_rdp += 1,
        }
    }

    /// Mean arity of received tuples and templates.
    pub fn average_received_arity(&self) -> f64 {
        average(self.received_arity_total, self.out_requests + self.get_requests())
    }

    /// Mean arity of sent tuples.
    pub fn average_sent_arity(&self) -> f64 {
        average(self.sent_arity_total, self.sent_tuples)
    }

    /// All template requests.
    pub fn get_requests(&self) -> u64 {
        self.in_requests + self.inp_requests + self.rd_requests + self.rdp_requests
    }

    /// Emit a snapshot at `info`.
    pub fn log_snapshot(&self) {
        info!(
            received = self.received_messages,
            sent = self.sent_messages,
            out_requests = self.out_requests,
            in_requests = self.in_requests,
            inp_requests = self.inp_requests,
            rd_requests = self.rd_requests,
            rdp_requests = self.rdp_requests,
            rejected_inp = self.rejected_inp,
            rejected_rdp = self.rejected_rdp,
            queued_in = self.queued_in,
            queued_rd = self.queued_rd,
            stashed = self.currently_stashed,
            queued = self.currently_queued,
            avg_received_arity = self.average_received_arity(),
            avg_sent_arity = self.average_sent_arity(),
            serialization_issues = self.serialization_issues,
            invalid_get = self.invalid_get_requests,
            invalid_send = self.invalid_send_requests,
            errors = self.errors,
            abandoned = self.abandoned_deliveries,
            "metrics"
        );
    }
}

fn average(total: u64, count: u64) -> f64 {
    if count == 0 { 0.0 } else { total as f64 / count as f64 }
}
