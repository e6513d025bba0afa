//! Transport errors.

use thiserror::Error;

/// Failure of a transport operation.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Underlying socket error
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport was torn down
    #[error("transport is closed")]
    Closed,
}
