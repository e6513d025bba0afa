//! Property tests for the store under clients that never acknowledge.

use std::net::SocketAddr;

use proptest::prelude::*;
use tuplespace_proto::{Field, FieldType, Operation, Tuple};
use tuplespace_server::{ResendPolicy, Store};

const INTERVAL_MS: u64 = 100;
const MAX_RESENDS: u32 = 2;

#[derive(Debug, Clone)]
enum Op {
    Out(u32),
    Get { requester: u16, wanted: Option<u32>, operation: Operation },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u32..4).prop_map(Op::Out),
        (0u16..3, prop::option::of(0u32..4), prop::sample::select(Operation::ALL.to_vec()))
            .prop_map(|(requester, wanted, operation)| Op::Get { requester, wanted, operation }),
    ]
}

fn addr(requester: u16) -> SocketAddr {
    SocketAddr::from(([10, 0, 0, 1], 2000 + requester))
}

fn tuple(n: u32) -> Tuple {
    Tuple::new(vec![Field::uint(n), Field::string("t")]).unwrap()
}

fn template(wanted: Option<u32>) -> Tuple {
    let first = wanted.map_or(Field::wildcard(FieldType::Uint), Field::uint);
    Tuple::new(vec![first, Field::wildcard(FieldType::String)]).unwrap()
}

proptest! {
    #[test]
    fn unacknowledged_tuples_all_come_back(ops in prop::collection::vec(op(), 1..40)) {
        let mut store = Store::new(ResendPolicy { interval_ms: INTERVAL_MS, max_resends: MAX_RESENDS });
        let mut now = 0;
        let mut outs = 0;

        for op in &ops {
            now += 7;
            match op {
                Op::Out(n) => {
                    outs += 1;
                    store.out(addr(9), tuple(*n), now);
                },
                Op::Get { requester, wanted, operation } => {
                    store.get(addr(*requester), template(*wanted), *operation, now);
                },
            }
            store.sweep(now);
        }

        for _ in 0..1000 {
            if store.in_flight() == 0 {
                break;
            }
            now += INTERVAL_MS;
            store.sweep(now);
        }

        prop_assert_eq!(store.in_flight(), 0);
        prop_assert_eq!(store.queued(), 0);
        prop_assert_eq!(store.stashed(), outs);
    }
}
