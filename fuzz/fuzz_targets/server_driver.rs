//! Feed a stream of arbitrary datagrams from a few senders into the server
//! engine. Nothing may panic and the store counters must stay consistent.

#![no_main]

use std::net::SocketAddr;

use libfuzzer_sys::fuzz_target;
use tuplespace_server::{ServerConfig, ServerDriver};

fuzz_target!(|data: &[u8]| {
    let mut driver = ServerDriver::new(&ServerConfig::default());
    let mut now_ms = 0u64;

    // Each chunk: sender byte, time step byte, length byte, payload.
    let mut rest = data;
    while let [sender, step, len, tail @ ..] = rest {
        let len = usize::from(*len).min(tail.len());
        let (payload, next) = tail.split_at(len);
        rest = next;

        now_ms += u64::from(*step) * 16;
        let from = SocketAddr::from(([10, 0, 0, 1], 1000 + u16::from(*sender % 4)));
        driver.process_datagram(from, payload, now_ms);
        driver.tick(now_ms);

        let metrics = driver.metrics();
        assert_eq!(metrics.currently_stashed, driver.store().stashed() as u64);
        assert_eq!(metrics.currently_queued, driver.store().queued() as u64);
        assert!(driver.store().in_flight() <= 4);
    }
});
