//! Error types for tuple construction and the wire codec.

use thiserror::Error;

use crate::field::FieldType;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while building, encoding or decoding tuples and messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Zero-length datagram; the header byte is always required.
    #[error("empty datagram")]
    EmptyDatagram,

    /// Low nibble of the header byte is not a known message type.
    #[error("invalid message type: {0:#x}")]
    InvalidMessageType(u8),

    /// Tuple arity outside 1..=16.
    #[error("arity {0} out of range (1..=16)")]
    ArityOutOfRange(usize),

    /// Field flags byte carries a reserved or unknown type tag.
    #[error("invalid field type tag: {0:#x}")]
    InvalidFieldType(u8),

    /// Source buffer exhausted in the middle of a field.
    #[error("truncated input: need {needed} bytes, have {available}")]
    Truncated {
        /// Bytes required to finish the current item
        needed: usize,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Destination buffer cannot hold the encoded message.
    #[error("buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Encoded length of the message
        needed: usize,
        /// Capacity of the destination
        available: usize,
    },

    /// String payload does not fit the 16-bit length prefix.
    #[error("string of {0} bytes exceeds the 65535 byte limit")]
    StringTooLong(usize),

    /// String payload is not valid UTF-8.
    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    /// Type-checked field access failed.
    #[error(transparent)]
    FieldAccess(#[from] FieldAccessError),
}

/// Failure of a type-checked field accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FieldAccessError {
    /// Stored tag differs from the requested one.
    #[error("expected {expected} field, found {actual}")]
    TypeMismatch {
        /// Type requested by the caller
        expected: FieldType,
        /// Type actually stored
        actual: FieldType,
    },

    /// Wildcards carry no value.
    #[error("{0} wildcard has no value")]
    Wildcard(FieldType),
}
