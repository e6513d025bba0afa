//! Client protocol tests
//!
//! A fake transport plays the server: every datagram the client sends is
//! decoded and answered by a per-test responder, and the clock advances a
//! little on every receive poll.

use std::{collections::VecDeque, net::SocketAddr, time::Duration};

use tuplespace_client::{ClientConfig, ClientError, ErrorKind, TupleSpace};
use tuplespace_core::{Transport, TransportError};
use tuplespace_proto::{ClientMessage, Field, FieldType, Operation, ServerMessage, Tuple};

type Responder = Box<dyn FnMut(&ClientMessage) -> Vec<ServerMessage>>;

const POLL_STEP_MS: u64 = 10;

struct FakeServer {
    server: SocketAddr,
    now_ms: u64,
    inbox: VecDeque<(SocketAddr, Vec<u8>)>,
    sent: Vec<ClientMessage>,
    responder: Responder,
    /// Delivered ahead of the replies to every request.
    noise: Option<(SocketAddr, Vec<u8>)>,
}

impl FakeServer {
    fn new(responder: impl FnMut(&ClientMessage) -> Vec<ServerMessage> + 'static) -> Self {
        Self {
            server: server_addr(),
            now_ms: 0,
            inbox: VecDeque::new(),
            sent: Vec::new(),
            responder: Box::new(responder),
            noise: None,
        }
    }

    fn count(&self, opcode: fn(&ClientMessage) -> bool) -> usize {
        self.sent.iter().filter(|m| opcode(m)).count()
    }
}

impl Transport for FakeServer {
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<(SocketAddr, usize)>, TransportError> {
        self.now_ms += POLL_STEP_MS;
        Ok(self.inbox.pop_front().map(|(from, bytes)| {
            buf[..bytes.len()].copy_from_slice(&bytes);
            (from, bytes.len())
        }))
    }

    fn send(&mut self, to: SocketAddr, payload: &[u8]) -> Result<(), TransportError> {
        assert_eq!(to, self.server);
        let message = ClientMessage::decode(payload).unwrap();
        if let Some(noise) = &self.noise {
            self.inbox.push_back(noise.clone());
        }
        for reply in (self.responder)(&message) {
            self.inbox.push_back((self.server, reply.encode().unwrap()));
        }
        self.sent.push(message);
        Ok(())
    }

    fn clock_ms(&self) -> u64 {
        self.now_ms
    }

    fn teardown(&mut self) {}
}

fn server_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 43532))
}

fn config(max_repeats: u32) -> ClientConfig {
    ClientConfig { server: server_addr(), max_repeats, ack_await: Duration::from_millis(100) }
}

fn is_get(m: &ClientMessage) -> bool {
    matches!(m, ClientMessage::GetTuple { .. })
}

fn is_out(m: &ClientMessage) -> bool {
    matches!(m, ClientMessage::SendTuple(_))
}

fn is_ack(m: &ClientMessage) -> bool {
    matches!(m, ClientMessage::Received)
}

fn user_tuple() -> Tuple {
    Tuple::new(vec![Field::uint(42), Field::string("x")]).unwrap()
}

fn user_template() -> Tuple {
    Tuple::new(vec![Field::wildcard(FieldType::Uint), Field::string("x")]).unwrap()
}

fn with_id(id: u32, tuple: &Tuple) -> Tuple {
    let mut fields = vec![Field::uint(id)];
    fields.extend(tuple.fields().iter().cloned());
    Tuple::new(fields).unwrap()
}

/// Answers requests like a server that holds `user_tuple()` for connection 7.
fn well_behaved(message: &ClientMessage) -> Vec<ServerMessage> {
    match message {
        ClientMessage::SendTuple(_) | ClientMessage::Received => vec![ServerMessage::Received],
        ClientMessage::GetTuple { .. } => vec![ServerMessage::Tuple(with_id(7, &user_tuple()))],
    }
}

#[test]
fn out_prefixes_connection_id() {
    let mut space = TupleSpace::new(FakeServer::new(well_behaved), config(5));
    space.connection(7).out(&user_tuple()).unwrap();

    let sent = &space.protocol().transport().sent;
    assert_eq!(sent, &vec![ClientMessage::SendTuple(with_id(7, &user_tuple()))]);
}

#[test]
fn out_without_ack_wait_is_fire_and_forget() {
    let config = ClientConfig { ack_await: Duration::ZERO, ..config(5) };
    let mut space = TupleSpace::new(FakeServer::new(|_| Vec::new()), config);
    space.connection(7).out(&user_tuple()).unwrap();
    assert_eq!(space.protocol().transport().count(is_out), 1);
}

#[test]
fn out_gives_up_after_max_repeats() {
    let mut space = TupleSpace::new(FakeServer::new(|_| Vec::new()), config(3));
    let error = space.connection(7).out(&user_tuple()).unwrap_err();
    assert!(matches!(error, ClientError::RetriesExhausted { attempts: 3 }));
    assert_eq!(error.kind(), ErrorKind::InternalError);
    assert_eq!(space.protocol().transport().count(is_out), 3);
}

#[test]
fn take_strips_id_and_acknowledges() {
    let mut space = TupleSpace::new(FakeServer::new(well_behaved), config(5));
    let tuple = space.connection(7).take(&user_template()).unwrap();
    assert_eq!(tuple, user_tuple());

    let transport = space.protocol().transport();
    assert_eq!(transport.count(is_get), 1);
    assert_eq!(transport.count(is_ack), 1);
    let expected = with_id(7, &user_template());
    assert!(matches!(
        &transport.sent[0],
        ClientMessage::GetTuple { template, operation: Operation::In } if *template == expected
    ));
}

#[test]
fn try_read_reports_lack_of_tuple() {
    let mut space = TupleSpace::new(
        FakeServer::new(|m| match m {
            ClientMessage::GetTuple { .. } => vec![ServerMessage::LackOfTuple],
            _ => vec![ServerMessage::Received],
        }),
        config(5),
    );
    assert_eq!(space.connection(7).try_read(&user_template()).unwrap(), None);
    assert_eq!(space.protocol().transport().count(is_ack), 1);
}

#[test]
fn blocking_call_never_accepts_lack_of_tuple() {
    let mut space = TupleSpace::new(
        FakeServer::new(|m| match m {
            ClientMessage::GetTuple { .. } => vec![ServerMessage::LackOfTuple],
            _ => vec![ServerMessage::Received],
        }),
        config(5),
    );
    let error = space.connection(7).read(&user_template()).unwrap_err();
    assert!(matches!(error, ClientError::RetriesExhausted { attempts: 5 }));
    assert_eq!(error.kind(), ErrorKind::InternalError);
    assert_eq!(space.protocol().transport().count(is_ack), 0);
}

#[test]
fn late_lack_of_tuple_during_take_is_not_acknowledged() {
    let mut gets = 0;
    let responder = move |m: &ClientMessage| match m {
        ClientMessage::GetTuple { .. } => {
            gets += 1;
            if gets == 1 {
                // Resend left over from an earlier inp, then the keep-alive.
                vec![ServerMessage::LackOfTuple, ServerMessage::AwaitingTuple]
            } else {
                vec![ServerMessage::Tuple(with_id(7, &user_tuple()))]
            }
        },
        _ => vec![ServerMessage::Received],
    };
    let mut space = TupleSpace::new(FakeServer::new(responder), config(1));
    assert_eq!(space.connection(7).take(&user_template()).unwrap(), user_tuple());

    let transport = space.protocol().transport();
    assert_eq!(transport.count(is_get), 2);
    assert_eq!(transport.count(is_ack), 1);
}

#[test]
fn repeated_keep_alives_do_not_end_the_request() {
    let mut gets = 0;
    let responder = move |m: &ClientMessage| match m {
        ClientMessage::GetTuple { .. } => {
            gets += 1;
            if gets < 3 {
                vec![ServerMessage::AwaitingTuple; 3]
            } else {
                vec![ServerMessage::Tuple(with_id(7, &user_tuple()))]
            }
        },
        _ => vec![ServerMessage::Received],
    };
    let mut space = TupleSpace::new(FakeServer::new(responder), config(1));
    assert_eq!(space.connection(7).read(&user_template()).unwrap(), user_tuple());

    let transport = space.protocol().transport();
    assert_eq!(transport.count(is_get), 3);
    assert_eq!(transport.count(is_ack), 1);
}

#[test]
fn late_duplicate_tuple_does_not_answer_next_request() {
    let stale = Tuple::new(vec![Field::uint(0), Field::string("x")]).unwrap();
    let mut gets = 0;
    let responder = move |m: &ClientMessage| match m {
        ClientMessage::GetTuple { .. } => {
            gets += 1;
            if gets == 1 {
                vec![ServerMessage::Tuple(with_id(7, &user_tuple()))]
            } else {
                vec![ServerMessage::LackOfTuple]
            }
        },
        _ => vec![ServerMessage::Received, ServerMessage::Tuple(with_id(7, &stale))],
    };
    let mut space = TupleSpace::new(FakeServer::new(responder), config(3));
    let mut conn = space.connection(7);
    assert_eq!(conn.take(&user_template()).unwrap(), user_tuple());
    assert_eq!(conn.try_read(&user_template()).unwrap(), None);
    assert_eq!(space.protocol().transport().count(is_ack), 2);
}

#[test]
fn keep_alive_extends_retry_budget() {
    let mut gets = 0;
    let responder = move |m: &ClientMessage| match m {
        ClientMessage::GetTuple { .. } => {
            gets += 1;
            if gets == 1 {
                vec![ServerMessage::AwaitingTuple]
            } else {
                vec![ServerMessage::Tuple(with_id(7, &user_tuple()))]
            }
        },
        _ => vec![ServerMessage::Received],
    };
    let mut space = TupleSpace::new(FakeServer::new(responder), config(1));
    assert_eq!(space.connection(7).take(&user_template()).unwrap(), user_tuple());
    assert_eq!(space.protocol().transport().count(is_get), 2);
}

#[test]
fn request_without_keep_alive_exhausts_budget() {
    let mut space = TupleSpace::new(FakeServer::new(|_| Vec::new()), config(2));
    let error = space.connection(7).try_take(&user_template()).unwrap_err();
    assert!(matches!(error, ClientError::RetriesExhausted { attempts: 2 }));
}

#[test]
fn response_for_other_connection_is_rejected() {
    let mut space = TupleSpace::new(
        FakeServer::new(|m| match m {
            ClientMessage::GetTuple { .. } => vec![ServerMessage::Tuple(with_id(8, &user_tuple()))],
            _ => vec![ServerMessage::Received],
        }),
        config(5),
    );
    let error = space.connection(7).try_take(&user_template()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidResponseProtocol);
}

#[test]
fn datagrams_from_other_senders_are_ignored() {
    let mut transport = FakeServer::new(well_behaved);
    let bogus = Tuple::new(vec![Field::uint(0), Field::string("x")]).unwrap();
    transport.noise = Some((
        SocketAddr::from(([10, 9, 8, 7], 1)),
        ServerMessage::Tuple(with_id(7, &bogus)).encode().unwrap(),
    ));
    let mut space = TupleSpace::new(transport, config(5));
    assert_eq!(space.connection(7).read(&user_template()).unwrap(), user_tuple());
}

#[test]
fn invalid_arguments_fail_locally() {
    let mut space = TupleSpace::new(FakeServer::new(well_behaved), config(5));
    let mut conn = space.connection(7);

    let error = conn.out(&user_template()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidTuple);

    let sixteen = Tuple::new(vec![Field::int(1); 16]).unwrap();
    let error = conn.out(&sixteen).unwrap_err();
    assert!(matches!(error, ClientError::Encode(_)));
    assert_eq!(error.kind(), ErrorKind::InternalError);

    let error = conn.take(&user_tuple()).unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidTemplate);

    let mut fields = vec![Field::int(1); 15];
    fields.push(Field::wildcard(FieldType::Int));
    let wide = Tuple::new(fields).unwrap();
    assert_eq!(conn.try_read(&wide).unwrap_err().kind(), ErrorKind::InvalidTemplate);

    assert!(space.protocol().transport().sent.is_empty());
}

mod budget {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn silent_server_sees_exactly_max_repeats_sends(max_repeats in 1u32..8) {
            let mut space = TupleSpace::new(FakeServer::new(|_| Vec::new()), config(max_repeats));
            let error = space.connection(1).out(&user_tuple()).unwrap_err();
            prop_assert!(matches!(error, ClientError::RetriesExhausted { attempts } if attempts == max_repeats), "expected RetriesExhausted with max_repeats attempts, got {:?}", error);
            prop_assert_eq!(space.protocol().transport().count(is_out), max_repeats as usize);
        }

        #[test]
        fn each_keep_alive_buys_one_more_request(keep_alives in 0usize..6, max_repeats in 1u32..4) {
            let mut gets = 0usize;
            let responder = move |m: &ClientMessage| match m {
                ClientMessage::GetTuple { .. } => {
                    gets += 1;
                    if gets <= keep_alives { vec![ServerMessage::AwaitingTuple] } else { Vec::new() }
                },
                _ => vec![ServerMessage::Received],
            };
            let mut space = TupleSpace::new(FakeServer::new(responder), config(max_repeats));
            let error = space.connection(1).take(&user_template()).unwrap_err();
            let expected = max_repeats as usize + keep_alives;
            prop_assert!(matches!(error, ClientError::RetriesExhausted { .. }), "expected RetriesExhausted, got {:?}", error);
            prop_assert_eq!(space.protocol().transport().count(is_get), expected);
        }
    }
}
