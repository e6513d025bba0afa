//! Deterministic simulation harness for the tuple space.
//!
//! An in-memory datagram network with a virtual clock and seeded loss and
//! duplication, plus a reference model of the server store for model-based
//! tests.
//!
//! The client API blocks, so clients cannot run beside the server on a
//! scheduler. Instead a [`ServedTransport`] steps the shared server every time
//! the client polls for a datagram: the server always runs "in between" the
//! client's sends and receives.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_network;
pub mod sim_server;

pub use model::{ModelResponse, ModelStore};
pub use sim_network::{NetworkFaults, NetworkStats, SimNetwork, SimTransport};
pub use sim_server::{ServedTransport, SharedServer, create_shared_server};
