//! Tuple store and matching engine.
//!
//! The store holds three collections, all owned exclusively by the single
//! event-loop thread:
//!
//! - **stash**: deposited data tuples, bucketed by arity
//! - **queue**: blocking template requests waiting for a tuple, bucketed by
//!   arity, oldest first
//! - **in flight**: one record per requester for the response it has not yet
//!   acknowledged
//!
//! # Invariants
//!
//! - No stashed tuple matches any queued template. Every deposit scans the
//!   queue before it reaches the stash, and a request is only queued after a
//!   stash miss.
//! - A requester has at most one queued request and one in-flight record. A
//!   new request from the same address supersedes both.
//! - A tuple has exactly one owner: the stash, or one consuming delivery
//!   record. Non-consuming deliveries carry their own copy.
//!
//! # Record lifecycle
//!
//! ```text
//!  blocking miss ──> Awaiting ──(out matches)──> Delivery ──(ack)──> gone
//!                        │                           │
//!                max resends: withdraw       max resends: re-deposit
//!                queued request              (consuming) or drop
//!
//!  non-blocking miss ──> Lack ──(ack or max resends)──> gone
//! ```
//!
//! Only `Delivery` and `Lack` answer a definitive response, so only they are
//! cleared by an ack. An `Awaiting` record ends when its request is matched,
//! superseded or expires.
//!
//! All methods are synchronous and take the current time; they return the
//! datagrams to send as [`ServerAction`]s.

use std::{collections::BTreeMap, net::SocketAddr, time::Duration};

use tracing::{debug, info};
use tuplespace_core::clock::duration_ms;
use tuplespace_proto::{MAX_ARITY, Operation, ServerMessage, Tuple};

/// Effect requested by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Encode and send `message` to `to`
    Send {
        /// Destination address
        to: SocketAddr,
        /// Response to send
        message: ServerMessage,
    },
    /// A tuple delivery hit the resend limit
    Abandoned {
        /// Requester that never acknowledged
        requester: SocketAddr,
        /// Whether the tuple went back through matching
        redeposited: bool,
    },
}

/// Resend policy for in-flight records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResendPolicy {
    /// Minimum age in milliseconds before a record is sent again
    pub interval_ms: u64,
    /// Resends before a record is abandoned
    pub max_resends: u32,
}

impl ResendPolicy {
    /// Build from a duration and a resend cap.
    pub fn new(interval: Duration, max_resends: u32) -> Self {
        Self { interval_ms: duration_ms(interval), max_resends }
    }
}

/// One collection per arity, indexed by `arity - 1`.
#[derive(Debug)]
struct ArityBuckets<T> {
    buckets: [Vec<T>; MAX_ARITY],
}

impl<T> ArityBuckets<T> {
    fn new() -> Self {
        Self { buckets: std::array::from_fn(|_| Vec::new()) }
    }

    fn index(arity: usize) -> usize {
        arity.clamp(1, MAX_ARITY) - 1
    }

    fn get(&self, arity: usize) -> &[T] {
        &self.buckets[Self::index(arity)]
    }

    fn get_mut(&mut self, arity: usize) -> &mut Vec<T> {
        &mut self.buckets[Self::index(arity)]
    }

    fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.iter().flatten()
    }
}

/// Blocking template request waiting in the queue.
#[derive(Debug, Clone)]
struct PendingRequest {
    requester: SocketAddr,
    template: Tuple,
    removes: bool,
}

#[derive(Debug, Clone)]
enum RecordKind {
    /// Tuple sent but not acknowledged
    Delivery { tuple: Tuple, redeposit_on_abandon: bool },
    /// Blocking request queued; "awaiting tuple" keeps the requester waiting
    Awaiting,
    /// Non-blocking request refused; "lack of tuple" is resent until acked
    Lack,
}

impl RecordKind {
    /// Whether a client acknowledgment settles this record. Keep-alives are
    /// never acknowledged, so an ack seen while one is pending is stale.
    fn settled_by_ack(&self) -> bool {
        !matches!(self, Self::Awaiting)
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    kind: RecordKind,
    sent_at_ms: u64,
    resends: u32,
}

impl InFlight {
    fn new(kind: RecordKind, now_ms: u64) -> Self {
        Self { kind, sent_at_ms: now_ms, resends: 0 }
    }
}

/// Stash, pending-request queue and in-flight records.
#[derive(Debug)]
pub struct Store {
    stash: ArityBuckets<Tuple>,
    queue: ArityBuckets<PendingRequest>,
    in_flight: BTreeMap<SocketAddr, InFlight>,
    policy: ResendPolicy,
}

impl Store {
    /// Empty store.
    pub fn new(policy: ResendPolicy) -> Self {
        Self {
            stash: ArityBuckets::new(),
            queue: ArityBuckets::new(),
            in_flight: BTreeMap::new(),
            policy,
        }
    }

    /// Number of stashed tuples across all arities.
    pub fn stashed(&self) -> usize {
        self.stash.len()
    }

    /// Number of stashed tuples of one arity.
    pub fn stashed_with_arity(&self, arity: usize) -> usize {
        self.stash.get(arity).len()
    }

    /// Number of queued requests across all arities.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Number of queued requests of one arity.
    pub fn queued_with_arity(&self, arity: usize) -> usize {
        self.queue.get(arity).len()
    }

    /// Number of in-flight records.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `requester` has a request in the queue.
    pub fn is_queued(&self, requester: SocketAddr) -> bool {
        self.queue.iter().any(|request| request.requester == requester)
    }

    /// Whether this exact blocking request from `requester` is already
    /// waiting in the queue.
    ///
    /// A match means the datagram is a retransmission: [`Store::get`] keeps
    /// the queue position instead of superseding it.
    pub fn is_queued_request(
        &self,
        requester: SocketAddr,
        template: &Tuple,
        operation: Operation,
    ) -> bool {
        operation.is_blocking()
            && self.queue.get(template.arity()).iter().any(|request| {
                request.requester == requester
                    && request.removes == operation.removes()
                    && request.template == *template
            })
    }

    /// Whether `requester` has an unacknowledged record.
    pub fn has_in_flight(&self, requester: SocketAddr) -> bool {
        self.in_flight.contains_key(&requester)
    }

    /// Deposit `tuple` from `from` and acknowledge it.
    ///
    /// The tuple is offered to the queued requests of its arity in arrival
    /// order. Every matching reader gets a copy; the first matching taker
    /// consumes it. A tuple nobody consumed is stashed. The returned actions
    /// hold the deliveries followed by the "received" for `from`.
    pub fn out(&mut self, from: SocketAddr, tuple: Tuple, now_ms: u64) -> Vec<ServerAction> {
        let mut actions = Vec::new();
        self.deposit(tuple, now_ms, &mut actions);
        actions.push(ServerAction::Send { to: from, message: ServerMessage::Received });
        actions
    }

    /// Serve a template request from `from`.
    ///
    /// The oldest stashed tuple that matches is delivered, removed from the
    /// stash when `operation` consumes. On a miss a blocking request is
    /// queued and answered with "awaiting tuple"; a non-blocking one gets
    /// "lack of tuple".
    ///
    /// A new request supersedes whatever `from` had in flight. The exception
    /// is a retransmission of the blocking request `from` already has queued:
    /// it keeps its queue position and only restarts the keep-alive.
    pub fn get(
        &mut self,
        from: SocketAddr,
        template: Tuple,
        operation: Operation,
        now_ms: u64,
    ) -> Vec<ServerAction> {
        let mut actions = Vec::new();

        if self.is_queued_request(from, &template, operation) {
            debug!(%from, %template, %operation, "duplicate request still queued");
            self.keep_alive(from, now_ms, &mut actions);
            actions.push(ServerAction::Send { to: from, message: ServerMessage::AwaitingTuple });
            return actions;
        }

        self.supersede(from, now_ms, &mut actions);

        let arity = template.arity();
        let bucket = self.stash.get_mut(arity);
        if let Some(pos) = bucket.iter().position(|tuple| template.matches(tuple)) {
            let tuple = if operation.removes() { bucket.remove(pos) } else { bucket[pos].clone() };
            info!(%from, %operation, %tuple, "matched stashed tuple");
            self.deliver(from, tuple, operation.removes(), now_ms, &mut actions);
        } else if operation.is_blocking() {
            info!(%from, %operation, %template, "queued request");
            self.queue.get_mut(arity).push(PendingRequest {
                requester: from,
                template,
                removes: operation.removes(),
            });
            self.in_flight.insert(from, InFlight::new(RecordKind::Awaiting, now_ms));
            actions.push(ServerAction::Send { to: from, message: ServerMessage::AwaitingTuple });
        } else {
            debug!(%from, %operation, %template, "no tuple");
            self.in_flight.insert(from, InFlight::new(RecordKind::Lack, now_ms));
            actions.push(ServerAction::Send { to: from, message: ServerMessage::LackOfTuple });
        }
        actions
    }

    /// Handle an acknowledgment from `from`. Always answered.
    ///
    /// Clears a pending tuple delivery or "lack of tuple" record. A queued
    /// request's keep-alive stays: the ack belongs to an earlier exchange and
    /// the keep-alive is what eventually withdraws the request if the client
    /// goes away.
    pub fn ack(&mut self, from: SocketAddr) -> Vec<ServerAction> {
        match self.in_flight.get(&from) {
            Some(record) if record.kind.settled_by_ack() => {
                self.in_flight.remove(&from);
                debug!(%from, "acknowledged");
            },
            Some(_) => debug!(%from, "stale acknowledgment while request is queued"),
            None => {},
        }
        vec![ServerAction::Send { to: from, message: ServerMessage::Received }]
    }

    /// Resend or abandon every record older than the resend interval.
    ///
    /// A record that has been resent the policy's maximum number of times is
    /// abandoned instead: an unacknowledged consuming delivery goes back into
    /// the space through the normal matching path, a read copy is dropped,
    /// and an expired keep-alive withdraws its queued request.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<ServerAction> {
        let due: Vec<SocketAddr> = self
            .in_flight
            .iter()
            .filter(|(_, record)| now_ms.saturating_sub(record.sent_at_ms) >= self.policy.interval_ms)
            .map(|(addr, _)| *addr)
            .collect();

        let mut actions = Vec::new();
        for requester in due {
            let Some(mut record) = self.in_flight.remove(&requester) else {
                continue;
            };

            if record.resends >= self.policy.max_resends {
                self.abandon(requester, record, now_ms, &mut actions);
                continue;
            }

            record.resends += 1;
            record.sent_at_ms = now_ms;
            let message = match &record.kind {
                RecordKind::Delivery { tuple, .. } => ServerMessage::Tuple(tuple.clone()),
                RecordKind::Awaiting => ServerMessage::AwaitingTuple,
                RecordKind::Lack => ServerMessage::LackOfTuple,
            };
            debug!(%requester, resend = record.resends, ?message, "resending");
            actions.push(ServerAction::Send { to: requester, message });
            self.in_flight.insert(requester, record);
        }
        actions
    }

    /// Offer `tuple` to queued requests, then stash it if nobody consumed it.
    fn deposit(&mut self, tuple: Tuple, now_ms: u64, actions: &mut Vec<ServerAction>) {
        let bucket = self.queue.get_mut(tuple.arity());
        let mut readers = Vec::new();
        let mut taker = None;
        let mut i = 0;
        while i < bucket.len() {
            if !bucket[i].template.matches(&tuple) {
                i += 1;
                continue;
            }
            let request = bucket.remove(i);
            if request.removes {
                taker = Some(request.requester);
                break;
            }
            readers.push(request.requester);
        }

        for reader in readers {
            info!(requester = %reader, %tuple, "delivering to queued reader");
            self.deliver(reader, tuple.clone(), false, now_ms, actions);
        }

        match taker {
            Some(requester) => {
                info!(%requester, %tuple, "delivering to queued taker");
                self.deliver(requester, tuple, true, now_ms, actions);
            },
            None => {
                info!(%tuple, "stashed");
                self.stash.get_mut(tuple.arity()).push(tuple);
            },
        }
    }

    fn deliver(
        &mut self,
        requester: SocketAddr,
        tuple: Tuple,
        redeposit_on_abandon: bool,
        now_ms: u64,
        actions: &mut Vec<ServerAction>,
    ) {
        actions.push(ServerAction::Send {
            to: requester,
            message: ServerMessage::Tuple(tuple.clone()),
        });
        let record =
            InFlight::new(RecordKind::Delivery { tuple, redeposit_on_abandon }, now_ms);
        if let Some(previous) = self.in_flight.insert(requester, record) {
            self.release(previous, now_ms, actions);
        }
    }

    /// Restart the keep-alive of a queued requester.
    ///
    /// The record replaced is normally the requester's previous keep-alive;
    /// anything else goes through [`Store::release`] like a superseded one.
    fn keep_alive(&mut self, requester: SocketAddr, now_ms: u64, actions: &mut Vec<ServerAction>) {
        let record = InFlight::new(RecordKind::Awaiting, now_ms);
        if let Some(previous) = self.in_flight.insert(requester, record) {
            self.release(previous, now_ms, actions);
        }
    }

    /// Drop whatever `from` had outstanding before a new request.
    fn supersede(&mut self, from: SocketAddr, now_ms: u64, actions: &mut Vec<ServerAction>) {
        self.withdraw(from);
        if let Some(previous) = self.in_flight.remove(&from) {
            self.release(previous, now_ms, actions);
        }
    }

    fn withdraw(&mut self, requester: SocketAddr) {
        for bucket in &mut self.queue.buckets {
            bucket.retain(|request| request.requester != requester);
        }
    }

    /// Return an unacknowledged consuming delivery to the space.
    fn release(&mut self, record: InFlight, now_ms: u64, actions: &mut Vec<ServerAction>) {
        if let RecordKind::Delivery { tuple, redeposit_on_abandon: true } = record.kind {
            self.deposit(tuple, now_ms, actions);
        }
    }

    fn abandon(
        &mut self,
        requester: SocketAddr,
        record: InFlight,
        now_ms: u64,
        actions: &mut Vec<ServerAction>,
    ) {
        match record.kind {
            RecordKind::Awaiting => {
                info!(%requester, "keep-alive expired");
                self.withdraw(requester);
            },
            RecordKind::Lack => debug!(%requester, "lack of tuple never acknowledged"),
            RecordKind::Delivery { tuple, redeposit_on_abandon } => {
                info!(%requester, %tuple, redeposit_on_abandon, "abandoning delivery");
                actions.push(ServerAction::Abandoned {
                    requester,
                    redeposited: redeposit_on_abandon,
                });
                if redeposit_on_abandon {
                    self.deposit(tuple, now_ms, actions);
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use tuplespace_proto::{Field, FieldType};

    use super::*;

    const INTERVAL: u64 = 1000;
    const MAX: u32 = 5;

    fn store() -> Store {
        Store::new(ResendPolicy { interval_ms: INTERVAL, max_resends: MAX })
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    fn data(n: u32, s: &str) -> Tuple {
        Tuple::new(vec![Field::uint(1), Field::uint(n), Field::string(s)]).unwrap()
    }

    fn template(s: &str) -> Tuple {
        Tuple::new(vec![Field::uint(1), Field::wildcard(FieldType::Uint), Field::string(s)])
            .unwrap()
    }

    fn send(to: SocketAddr, message: ServerMessage) -> ServerAction {
        ServerAction::Send { to, message }
    }

    fn sent_to(actions: &[ServerAction], to: SocketAddr) -> Vec<ServerMessage> {
        actions
            .iter()
            .filter_map(|action| match action {
                ServerAction::Send { to: dest, message } if *dest == to => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Sweep repeatedly until the resend budget is spent and one more sweep
    /// abandons the record.
    fn exhaust(store: &mut Store, start: u64) -> (Vec<ServerAction>, u64) {
        let mut now = start;
        let mut all = Vec::new();
        for _ in 0..=MAX {
            now += INTERVAL;
            all.extend(store.sweep(now));
        }
        (all, now)
    }

    #[test]
    fn out_then_in_consumes() {
        let mut store = store();
        let (a, b) = (addr(1), addr(2));

        assert_eq!(store.out(b, data(42, "x"), 0), vec![send(b, ServerMessage::Received)]);
        assert_eq!(store.stashed_with_arity(3), 1);

        let actions = store.get(a, template("x"), Operation::In, 0);
        assert_eq!(actions, vec![send(a, ServerMessage::Tuple(data(42, "x")))]);
        assert_eq!(store.stashed(), 0);
        assert!(store.has_in_flight(a));

        store.ack(a);
        let actions = store.get(a, template("x"), Operation::In, 10);
        assert_eq!(actions, vec![send(a, ServerMessage::AwaitingTuple)]);
        assert_eq!(store.queued_with_arity(3), 1);
    }

    #[test]
    fn rd_leaves_tuple_in_stash() {
        let mut store = store();
        let (a, b) = (addr(1), addr(2));
        store.out(b, data(42, "x"), 0);

        for now in [0, 5] {
            let actions = store.get(a, template("x"), Operation::Rd, now);
            assert_eq!(actions, vec![send(a, ServerMessage::Tuple(data(42, "x")))]);
            store.ack(a);
        }
        assert_eq!(store.stashed(), 1);
    }

    #[test]
    fn non_blocking_miss_does_not_queue() {
        let mut store = store();
        let a = addr(1);
        for operation in [Operation::Inp, Operation::Rdp] {
            let actions = store.get(a, template("x"), operation, 0);
            assert_eq!(actions, vec![send(a, ServerMessage::LackOfTuple)]);
            assert_eq!(store.queued(), 0);
            assert!(store.has_in_flight(a));
            store.ack(a);
            assert!(!store.has_in_flight(a));
        }
    }

    #[test]
    fn queued_in_is_satisfied_by_later_out() {
        let mut store = store();
        let (a, b) = (addr(1), addr(2));

        assert_eq!(
            store.get(a, template("x"), Operation::In, 0),
            vec![send(a, ServerMessage::AwaitingTuple)]
        );

        let actions = store.out(b, data(42, "x"), 10);
        assert_eq!(
            actions,
            vec![
                send(a, ServerMessage::Tuple(data(42, "x"))),
                send(b, ServerMessage::Received)
            ]
        );
        assert_eq!(store.stashed_with_arity(3), 0);
        assert_eq!(store.queued(), 0);
    }

    #[test]
    fn one_out_satisfies_all_queued_readers_then_stashes() {
        let mut store = store();
        let (r1, r2, w) = (addr(1), addr(2), addr(3));
        store.get(r1, template("x"), Operation::Rd, 0);
        store.get(r2, template("x"), Operation::Rd, 0);

        let actions = store.out(w, data(1, "x"), 0);
        assert_eq!(sent_to(&actions, r1), vec![ServerMessage::Tuple(data(1, "x"))]);
        assert_eq!(sent_to(&actions, r2), vec![ServerMessage::Tuple(data(1, "x"))]);
        assert_eq!(sent_to(&actions, w), vec![ServerMessage::Received]);
        assert_eq!(store.stashed(), 1);
    }

    #[test]
    fn readers_before_taker_all_get_the_tuple() {
        let mut store = store();
        let (reader, taker, late, w) = (addr(1), addr(2), addr(3), addr(4));
        store.get(reader, template("x"), Operation::Rd, 0);
        store.get(taker, template("x"), Operation::In, 0);
        store.get(late, template("x"), Operation::Rd, 0);

        let actions = store.out(w, data(1, "x"), 0);
        assert_eq!(sent_to(&actions, reader).len(), 1);
        assert_eq!(sent_to(&actions, taker).len(), 1);
        assert!(sent_to(&actions, late).is_empty());
        assert_eq!(store.stashed(), 0);
        assert!(store.is_queued(late));
    }

    #[test]
    fn queue_is_first_in_first_out() {
        let mut store = store();
        let (first, second, w) = (addr(1), addr(2), addr(3));
        store.get(first, template("x"), Operation::In, 0);
        store.get(second, template("x"), Operation::In, 1);

        let actions = store.out(w, data(1, "x"), 2);
        assert_eq!(sent_to(&actions, first), vec![ServerMessage::Tuple(data(1, "x"))]);
        assert!(sent_to(&actions, second).is_empty());
        assert!(store.is_queued(second));
    }

    #[test]
    fn unacked_delivery_is_resent_then_redeposited() {
        let mut store = store();
        let (a, b, c) = (addr(1), addr(2), addr(3));
        store.get(a, template("x"), Operation::In, 0);
        store.out(b, data(42, "x"), 0);
        assert_eq!(store.stashed(), 0);

        let (actions, now) = exhaust(&mut store, 0);
        let resent = sent_to(&actions, a);
        assert_eq!(resent.len(), MAX as usize);
        assert!(resent.iter().all(|m| *m == ServerMessage::Tuple(data(42, "x"))));
        assert!(actions.contains(&ServerAction::Abandoned { requester: a, redeposited: true }));
        assert!(!store.has_in_flight(a));
        assert_eq!(store.stashed(), 1);

        let actions = store.get(c, template("x"), Operation::In, now);
        assert_eq!(actions, vec![send(c, ServerMessage::Tuple(data(42, "x")))]);
    }

    #[test]
    fn abandoned_read_copy_is_dropped() {
        let mut store = store();
        let (a, b) = (addr(1), addr(2));
        store.out(b, data(42, "x"), 0);
        store.get(a, template("x"), Operation::Rd, 0);

        let (actions, _) = exhaust(&mut store, 0);
        assert!(actions.contains(&ServerAction::Abandoned { requester: a, redeposited: false }));
        assert_eq!(store.stashed(), 1);
    }

    #[test]
    fn redeposit_satisfies_request_queued_meanwhile() {
        let mut store = store();
        let (a, b, c) = (addr(1), addr(2), addr(3));
        store.out(b, data(42, "x"), 0);
        store.get(a, template("x"), Operation::In, 0);
        store.get(c, template("x"), Operation::In, 0);
        assert!(store.is_queued(c));

        // Keep c's request alive while a's delivery runs out of resends.
        let mut now = 0;
        let mut actions = Vec::new();
        for _ in 0..=MAX {
            now += INTERVAL;
            store.get(c, template("x"), Operation::In, now);
            actions.extend(store.sweep(now));
        }
        assert_eq!(sent_to(&actions, c), vec![ServerMessage::Tuple(data(42, "x"))]);
        assert_eq!(store.stashed(), 0);
    }

    #[test]
    fn keep_alive_resends_awaiting_then_expires() {
        let mut store = store();
        let a = addr(1);
        store.get(a, template("x"), Operation::In, 0);

        let (actions, _) = exhaust(&mut store, 0);
        let pings = sent_to(&actions, a);
        assert_eq!(pings.len(), MAX as usize);
        assert!(pings.iter().all(|m| *m == ServerMessage::AwaitingTuple));
        assert!(!store.has_in_flight(a));
        assert!(!store.is_queued(a));
    }

    #[test]
    fn ack_does_not_clear_queued_keep_alive() {
        let mut store = store();
        let a = addr(1);
        store.get(a, template("x"), Operation::In, 0);

        assert_eq!(store.ack(a), vec![send(a, ServerMessage::Received)]);
        assert!(store.has_in_flight(a));
        assert!(store.is_queued(a));

        exhaust(&mut store, 0);
        assert!(!store.has_in_flight(a));
        assert!(!store.is_queued(a));
        assert_eq!(store.queued(), 0);
    }

    #[test]
    fn duplicate_blocking_request_restarts_keep_alive() {
        let mut store = store();
        let a = addr(1);
        store.get(a, template("x"), Operation::Rd, 0);
        assert!(store.is_queued_request(a, &template("x"), Operation::Rd));
        assert!(!store.is_queued_request(a, &template("x"), Operation::In));
        assert!(!store.is_queued_request(a, &template("x"), Operation::Rdp));

        store.get(a, template("x"), Operation::Rd, INTERVAL - 1);
        assert!(store.sweep(INTERVAL).is_empty());
        assert_eq!(store.sweep(2 * INTERVAL - 1), vec![send(a, ServerMessage::AwaitingTuple)]);
        assert_eq!(store.in_flight(), 1);
        assert_eq!(store.queued(), 1);
    }

    #[test]
    fn lack_of_tuple_is_resent_until_acked() {
        let mut store = store();
        let a = addr(1);
        store.get(a, template("x"), Operation::Inp, 0);

        assert!(store.sweep(INTERVAL - 1).is_empty());
        assert_eq!(store.sweep(INTERVAL), vec![send(a, ServerMessage::LackOfTuple)]);
        store.ack(a);
        assert!(store.sweep(10 * INTERVAL).is_empty());
    }

    #[test]
    fn duplicate_blocking_request_keeps_queue_position() {
        let mut store = store();
        let (first, second, w) = (addr(1), addr(2), addr(3));
        store.get(first, template("x"), Operation::In, 0);
        store.get(second, template("x"), Operation::In, 1);
        assert_eq!(
            store.get(first, template("x"), Operation::In, 2),
            vec![send(first, ServerMessage::AwaitingTuple)]
        );
        assert_eq!(store.queued(), 2);

        let actions = store.out(w, data(1, "x"), 3);
        assert_eq!(sent_to(&actions, first).len(), 1);
        assert!(store.is_queued(second));
    }

    #[test]
    fn retransmitted_in_after_lost_tuple_gets_it_again() {
        let mut store = store();
        let (a, b) = (addr(1), addr(2));
        store.out(b, data(42, "x"), 0);
        store.get(a, template("x"), Operation::In, 0);

        // Tuple datagram lost; client retries the same request.
        let actions = store.get(a, template("x"), Operation::In, 500);
        assert_eq!(actions, vec![send(a, ServerMessage::Tuple(data(42, "x")))]);
        assert_eq!(store.stashed(), 0);
        assert_eq!(store.in_flight(), 1);
    }

    #[test]
    fn new_request_withdraws_previous_one() {
        let mut store = store();
        let a = addr(1);
        store.get(a, template("x"), Operation::In, 0);
        store.get(a, template("y"), Operation::In, 1);
        assert_eq!(store.queued(), 1);

        let actions = store.out(addr(2), data(1, "x"), 2);
        assert!(sent_to(&actions, a).is_empty());
        assert_eq!(store.stashed(), 1);
    }

    #[test]
    fn duplicate_out_frames_deposit_twice_without_crashing() {
        let mut store = store();
        let b = addr(2);
        store.out(b, data(1, "x"), 0);
        store.out(b, data(1, "x"), 0);
        assert_eq!(store.stashed(), 2);
        assert_eq!(store.in_flight(), 0);
    }

    #[test]
    fn ack_without_record_is_still_answered() {
        let mut store = store();
        let a = addr(1);
        assert_eq!(store.ack(a), vec![send(a, ServerMessage::Received)]);
    }

    #[test]
    fn arities_do_not_mix() {
        let mut store = store();
        let a = addr(1);
        store.out(addr(2), Tuple::new(vec![Field::uint(1), Field::uint(5)]).unwrap(), 0);
        let actions = store.get(a, template("x"), Operation::Rdp, 0);
        assert_eq!(actions, vec![send(a, ServerMessage::LackOfTuple)]);
    }
}
