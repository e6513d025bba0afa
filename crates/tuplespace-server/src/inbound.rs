//! Classification of inbound datagrams.
//!
//! Every datagram the server receives becomes exactly one [`Inbound`]. The
//! store only ever sees the well-formed requests; everything else is counted
//! and logged by the driver, then dropped.

use tuplespace_proto::{
    ClientMessage, ClientOpcode, Operation, ProtocolError, Tuple, codec::split_header,
};

/// Smallest declared arity of a well-formed `GET_TUPLE`: the connection id
/// plus at least one template field.
pub const MIN_GET_ARITY: usize = 2;

/// Inbound datagram after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Data tuple to deposit
    Out {
        /// Tuple as sent, connection id first
        tuple: Tuple,
    },
    /// Template request
    Get {
        /// Template as sent, connection id first
        template: Tuple,
        /// Primitive selected by the request flags
        operation: Operation,
    },
    /// Client acknowledgment
    Ack,
    /// Header was valid but the field stream was not
    SerializationIssue {
        /// Opcode from the header
        opcode: ClientOpcode,
        /// Decoder error
        error: ProtocolError,
    },
    /// Decoded fine but breaks a request invariant: a wildcard in an `out`
    /// tuple, or a template without a wildcard
    InvalidInvariant {
        /// Opcode from the header
        opcode: ClientOpcode,
    },
    /// Empty datagram or unknown message type
    Malformed {
        /// Decoder error
        error: ProtocolError,
    },
}

/// Decode and validate one client datagram.
pub fn classify(bytes: &[u8]) -> Inbound {
    let Some(&header) = bytes.first() else {
        return Inbound::Malformed { error: ProtocolError::EmptyDatagram };
    };
    let (message_type, arity) = split_header(header);
    let Some(opcode) = ClientOpcode::from_u8(message_type) else {
        return Inbound::Malformed { error: ProtocolError::InvalidMessageType(message_type) };
    };

    if opcode == ClientOpcode::GetTuple && arity < MIN_GET_ARITY {
        return Inbound::SerializationIssue { opcode, error: ProtocolError::ArityOutOfRange(arity) };
    }

    match ClientMessage::decode(bytes) {
        Ok(ClientMessage::SendTuple(tuple)) if tuple.is_data() => Inbound::Out { tuple },
        Ok(ClientMessage::GetTuple { template, operation }) if !template.is_data() => {
            Inbound::Get { template, operation }
        },
        Ok(ClientMessage::Received) => Inbound::Ack,
        Ok(_) => Inbound::InvalidInvariant { opcode },
        Err(error) => Inbound::SerializationIssue { opcode, error },
    }
}
