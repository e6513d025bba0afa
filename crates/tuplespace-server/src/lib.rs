//! Tuple space server
//!
//! Holds deposited tuples and pending template requests, matches them, and
//! delivers results over an unreliable datagram transport with resends until
//! each client acknowledges.
//!
//! # Architecture
//!
//! ```text
//!  Transport ──bytes──> ServerDriver ──Inbound──> Store
//!      ^                     │                      │
//!      └──── Server loop <───┴──── ServerAction <───┘
//! ```
//!
//! [`inbound::classify`] validates datagrams, the [`Store`] implements the
//! matching and resend policy, and the [`ServerDriver`] glues them together
//! with metrics. None of these perform I/O. [`Server`] is the thin loop that
//! moves bytes between a [`tuplespace_core::Transport`] and the driver.

pub mod config;
pub mod driver;
pub mod error;
pub mod inbound;
pub mod metrics;
pub mod server;
pub mod store;

pub use config::ServerConfig;
pub use driver::ServerDriver;
pub use error::ServerError;
pub use inbound::Inbound;
pub use metrics::ServerMetrics;
pub use server::Server;
pub use store::{ResendPolicy, ServerAction, Store};
