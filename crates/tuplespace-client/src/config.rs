//! Client configuration.

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server address; responses from anywhere else are ignored
    pub server: SocketAddr,
    /// Sends per request before giving up; 0 retries forever
    pub max_repeats: u32,
    /// Wait for a response after each send. Zero makes `out` fire-and-forget
    pub ack_await: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: SocketAddr::from((Ipv4Addr::LOCALHOST, 43532)),
            max_repeats: 5,
            ack_await: Duration::from_millis(1000),
        }
    }
}
