//! Tuple model and wire format for the tuple space protocol.
//!
//! Clients and the server exchange single UDP datagrams. Every datagram
//! starts with a header byte whose low nibble is the message type and whose
//! high nibble is `arity - 1`. Messages that carry a tuple follow the header
//! with a self-describing field stream. Control messages (acks, keep-alives,
//! "lack of tuple") are exactly one byte.
//!
//! The format is deliberately small: the whole datagram budget is
//! [`MAX_DATAGRAM_SIZE`] bytes, numerics are 4 bytes little-endian, booleans
//! live in the field flags byte, and strings carry a 16-bit length with no
//! terminator.
//!
//! # Matching
//!
//! A template matches a data tuple of the same arity when every position has
//! the same type and every data-carrying template position holds an equal
//! value. Float equality is bitwise, so every tuple matches itself.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod errors;
pub mod field;
pub mod flags;
pub mod message;
pub mod opcodes;
pub mod tuple;

pub use codec::MAX_DATAGRAM_SIZE;
pub use errors::{FieldAccessError, ProtocolError, Result};
pub use field::{Field, FieldType, Value};
pub use flags::{GetFlags, Operation};
pub use message::{ClientMessage, ServerMessage};
pub use opcodes::{ClientOpcode, ServerOpcode};
pub use tuple::{MAX_ARITY, Tuple, TupleSpan};
