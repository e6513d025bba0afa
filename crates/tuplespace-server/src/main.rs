//! Tuple space server binary.
//!
//! Parses arguments, installs logging and runs the synchronous event loop on a
//! blocking task until Ctrl-C.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tuplespace_core::UdpTransport;
use tuplespace_server::{Server, ServerConfig, ServerError, config::DEFAULT_PORT};

/// Upper bound on how long one receive blocks, so shutdown and resends stay
/// responsive.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Tuple space server over UDP.
#[derive(Parser, Debug)]
#[command(name = "tuplespace-server", version, about)]
struct Args {
    /// Local address to bind; overrides --port
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// UDP port on all interfaces
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Milliseconds before an unacknowledged response is resent
    #[arg(long, default_value_t = 1000)]
    resend_interval_ms: u64,

    /// Resends before a delivery is abandoned
    #[arg(long, default_value_t = 5)]
    max_resends: u32,

    /// Milliseconds between metrics snapshots (0 disables them)
    #[arg(long, default_value_t = 1000)]
    metrics_interval_ms: u64,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind: self.bind.unwrap_or_else(|| SocketAddr::new(defaults.bind.ip(), self.port)),
            resend_interval: Duration::from_millis(self.resend_interval_ms),
            max_resends: self.max_resends,
            metrics_interval: Duration::from_millis(self.metrics_interval_ms),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Args::parse().into_config();
    let transport = UdpTransport::bind(config.bind)?.with_poll_timeout(POLL_TIMEOUT)?;
    info!(addr = %transport.local_addr(), "listening");

    let shutdown = Arc::new(AtomicBool::new(false));
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutdown requested"),
            Err(error) => warn!(%error, "cannot listen for ctrl-c; stopping"),
        }
        signal.store(true, Ordering::Relaxed);
    });

    let event_loop = tokio::task::spawn_blocking(move || {
        let mut server = Server::new(transport, &config);
        server.run(&shutdown)
    });
    event_loop.await?
}
