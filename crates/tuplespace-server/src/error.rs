//! Server errors.

use thiserror::Error;
use tuplespace_core::TransportError;

/// Errors that stop the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Transport could not be opened or was closed underneath the loop
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Event loop task panicked or was cancelled
    #[error("event loop task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
