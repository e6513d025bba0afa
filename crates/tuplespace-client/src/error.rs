//! Client errors.

use thiserror::Error;
use tuplespace_core::TransportError;
use tuplespace_proto::ProtocolError;

/// Failure of a client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Tuple passed to `out` has a wildcard or leaves no room for the
    /// connection id
    #[error("invalid tuple: {0}")]
    InvalidTuple(&'static str),

    /// Template cannot be sent
    #[error("invalid template: {0}")]
    InvalidTemplate(&'static str),

    /// Server answered with something the request does not allow
    #[error("invalid response: {0}")]
    InvalidResponseProtocol(&'static str),

    /// No definitive answer after the whole retry budget
    #[error("no response after {attempts} attempts")]
    RetriesExhausted {
        /// Datagrams sent
        attempts: u32,
    },

    /// Socket failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Request does not fit a datagram
    #[error("cannot encode request: {0}")]
    Encode(#[from] ProtocolError),
}

/// Coarse result classes shared with other client implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure, encoding failure or retries exhausted
    InternalError,
    /// Bad `out` tuple
    InvalidTuple,
    /// Bad template
    InvalidTemplate,
    /// Unexpected response
    InvalidResponseProtocol,
}

impl ClientError {
    /// Result class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidTuple(_) => ErrorKind::InvalidTuple,
            Self::InvalidTemplate(_) => ErrorKind::InvalidTemplate,
            Self::InvalidResponseProtocol(_) => ErrorKind::InvalidResponseProtocol,
            Self::RetriesExhausted { .. } | Self::Transport(_) | Self::Encode(_) => {
                ErrorKind::InternalError
            },
        }
    }
}
