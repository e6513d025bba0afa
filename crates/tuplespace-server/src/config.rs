//! Server configuration.

use std::{
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

/// Default UDP port.
pub const DEFAULT_PORT: u16 = 43532;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the UDP socket binds to
    pub bind: SocketAddr,
    /// Age after which an unacknowledged response is sent again
    pub resend_interval: Duration,
    /// Resends before an in-flight record is abandoned
    pub max_resends: u32,
    /// How often the event loop logs a metrics snapshot
    pub metrics_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            resend_interval: Duration::from_millis(1000),
            max_resends: 5,
            metrics_interval: Duration::from_secs(1),
        }
    }
}
