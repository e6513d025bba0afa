//! Tuple space command-line client.
//!
//! Reads one command per line from stdin and prints each result to stdout.

use std::{
    io::{self, BufRead, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    time::Duration,
};

use clap::Parser;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tuplespace_cli::{Command, commands::HELP, parse};
use tuplespace_client::{ClientConfig, Connection, TupleSpace};
use tuplespace_core::{Transport, TransportError, UdpTransport};

/// Longest single receive wait; the protocol keeps its own deadlines.
const POLL_TIMEOUT: Duration = Duration::from_millis(5);

/// Line-oriented tuple space client.
#[derive(Parser, Debug)]
#[command(name = "tuplespace-cli", version, about)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:43532")]
    server: SocketAddr,

    /// Sends per request before giving up (0 retries forever)
    #[arg(short, long, default_value_t = 5)]
    repeats: u32,

    /// Milliseconds to wait for each response (0 makes `out` fire-and-forget)
    #[arg(long, default_value_t = 1000)]
    ack_await_ms: u64,

    /// Connection id; clients sharing an id share tuples
    #[arg(short, long, default_value_t = 0)]
    connection_id: u32,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("terminal: {0}")]
    Io(#[from] io::Error),
}

fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let local = match args.server {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    };
    let transport = UdpTransport::bind(local)?.with_poll_timeout(POLL_TIMEOUT)?;
    debug!(local = %transport.local_addr(), server = %args.server, "client bound");

    let config = ClientConfig {
        server: args.server,
        max_repeats: args.repeats,
        ack_await: Duration::from_millis(args.ack_await_ms),
    };
    let mut space = TupleSpace::new(transport, config);
    let result = repl(&mut space.connection(args.connection_id));
    space.close();
    result
}

fn repl<T: Transport>(conn: &mut Connection<'_, T>) -> Result<(), CliError> {
    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        match parse(&line?) {
            Command::Quit => break,
            Command::Empty => {},
            Command::Help => writeln!(stdout, "{HELP}")?,
            Command::Out { tuple } => match conn.out(&tuple) {
                Ok(()) => writeln!(stdout, "ok")?,
                Err(error) => writeln!(stdout, "error: {error}")?,
            },
            Command::Get { operation, template } => match conn.request(&template, operation) {
                Ok(Some(tuple)) => writeln!(stdout, "{tuple}")?,
                Ok(None) => writeln!(stdout, "no tuple")?,
                Err(error) => writeln!(stdout, "error: {error}")?,
            },
            invalid @ (Command::Unknown { .. } | Command::InvalidArgs { .. }) => {
                writeln!(stdout, "{invalid}")?;
            },
        }
        stdout.flush()?;
    }
    Ok(())
}
