//! Event loop over a [`Transport`].
//!
//! Each [`Server::step`] polls the transport once, dispatches at most one
//! datagram, runs one resend sweep and, when due, logs a metrics snapshot.
//! The loop is single-threaded; the store needs no locking.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};
use tuplespace_core::{Transport, TransportError, clock::duration_ms};
use tuplespace_proto::MAX_DATAGRAM_SIZE;

use crate::{
    config::ServerConfig,
    driver::ServerDriver,
    error::ServerError,
    store::ServerAction,
};

/// Tuple space server bound to a transport.
#[derive(Debug)]
pub struct Server<T: Transport> {
    transport: T,
    driver: ServerDriver,
    recv_buf: [u8; MAX_DATAGRAM_SIZE],
    metrics_interval_ms: u64,
    last_metrics_ms: u64,
}

impl<T: Transport> Server<T> {
    /// Create a server that owns `transport`.
    pub fn new(transport: T, config: &ServerConfig) -> Self {
        let last_metrics_ms = transport.clock_ms();
        Self {
            transport,
            driver: ServerDriver::new(config),
            recv_buf: [0; MAX_DATAGRAM_SIZE],
            metrics_interval_ms: duration_ms(config.metrics_interval),
            last_metrics_ms,
        }
    }

    /// Engine state, for inspection.
    pub fn driver(&self) -> &ServerDriver {
        &self.driver
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// One loop iteration. Returns whether a datagram was handled.
    ///
    /// Transport failures are logged and counted; only a closed transport is
    /// reported to the caller.
    pub fn step(&mut self) -> Result<bool, ServerError> {
        let received = match self.transport.recv(&mut self.recv_buf) {
            Ok(received) => received,
            Err(TransportError::Closed) => return Err(TransportError::Closed.into()),
            Err(error) => {
                warn!(%error, "receive failed");
                self.driver.record_transport_error();
                None
            },
        };

        if let Some((from, len)) = received {
            let now = self.transport.clock_ms();
            let bytes = &self.recv_buf[..len.min(MAX_DATAGRAM_SIZE)];
            let actions = self.driver.process_datagram(from, bytes, now);
            self.execute(actions)?;
        }

        let now = self.transport.clock_ms();
        let actions = self.driver.tick(now);
        self.execute(actions)?;

        if self.metrics_interval_ms > 0
            && now.saturating_sub(self.last_metrics_ms) >= self.metrics_interval_ms
        {
            self.last_metrics_ms = now;
            self.driver.metrics().log_snapshot();
        }

        Ok(received.is_some())
    }

    /// Step until `shutdown` is set, then tear down the transport.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<(), ServerError> {
        info!("server loop started");
        let result = loop {
            if shutdown.load(Ordering::Relaxed) {
                break Ok(());
            }
            if let Err(error) = self.step() {
                break Err(error);
            }
        };
        self.driver.metrics().log_snapshot();
        self.transport.teardown();
        info!("server loop stopped");
        result
    }

    fn execute(&mut self, actions: Vec<ServerAction>) -> Result<(), ServerError> {
        let mut buf = [0u8; MAX_DATAGRAM_SIZE];
        for action in actions {
            let ServerAction::Send { to, message } = action else {
                continue;
            };
            let len = match message.encode_into(&mut buf) {
                Ok(len) => len,
                Err(error) => {
                    warn!(%to, %error, "response does not fit a datagram");
                    self.driver.record_transport_error();
                    continue;
                },
            };
            match self.transport.send(to, &buf[..len]) {
                Ok(()) => {},
                Err(TransportError::Closed) => return Err(TransportError::Closed.into()),
                Err(error) => {
                    warn!(%to, %error, "send failed");
                    self.driver.record_transport_error();
                },
            }
        }
        Ok(())
    }
}
