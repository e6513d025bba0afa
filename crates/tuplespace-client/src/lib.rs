//! Tuple space client
//!
//! Blocking, single-threaded client for the tuple space protocol. Each call
//! owns the transport until it returns: it sends its request, retries on
//! timeout, and acknowledges the server's answer.
//!
//! ```text
//!  TupleSpace ──connection(id)──> Connection::{out, take, try_take, read, try_read}
//!                                       │
//!                                       v
//!                               ProtocolClient<T: Transport>
//! ```
//!
//! # Components
//!
//! - [`api`]: Connection-scoped Linda operations
//! - [`protocol`]: Retry and acknowledgment state machines
//! - [`config`]: Server address and retry policy
//! - [`error`]: Error type and result classes

pub mod api;
pub mod config;
pub mod error;
pub mod protocol;

pub use api::{Connection, MAX_USER_ARITY, TupleSpace};
pub use config::ClientConfig;
pub use error::{ClientError, ErrorKind};
pub use protocol::{Incoming, ProtocolClient, Response};
