//! Protocol messages for both directions.
//!
//! [`ClientMessage`] and [`ServerMessage`] own their tuples and are what
//! decoders produce. For the send path the client also encodes directly from
//! a [`TupleSpan`] with [`encode_send_tuple`] and [`encode_get_tuple`]. That
//! way the connection id prefix never forces a copy of the caller's tuple.

use crate::{
    codec::{self, MAX_DATAGRAM_SIZE},
    errors::{ProtocolError, Result},
    field::Field,
    flags::{GetFlags, Operation},
    opcodes::{ClientOpcode, ServerOpcode},
    tuple::{Tuple, TupleSpan},
};

/// Encode a `SEND_TUPLE` request from a span.
pub fn encode_send_tuple(span: &TupleSpan<'_>, dst: &mut [u8]) -> Result<usize> {
    let fields: Vec<&Field> = span.iter().collect();
    codec::encode_message(dst, ClientOpcode::SendTuple.to_u8(), None, &fields)
}

/// Encode a `GET_TUPLE` request from a span.
pub fn encode_get_tuple(
    span: &TupleSpan<'_>,
    operation: Operation,
    dst: &mut [u8],
) -> Result<usize> {
    let fields: Vec<&Field> = span.iter().collect();
    codec::encode_message(
        dst,
        ClientOpcode::GetTuple.to_u8(),
        Some(operation.flags().bits()),
        &fields,
    )
}

/// Encode a server `TUPLE` response from a span.
pub fn encode_tuple_response(span: &TupleSpan<'_>, dst: &mut [u8]) -> Result<usize> {
    let fields: Vec<&Field> = span.iter().collect();
    codec::encode_message(dst, ServerOpcode::Tuple.to_u8(), None, &fields)
}

fn encode_control(message_type: u8, dst: &mut [u8]) -> Result<usize> {
    codec::encode_message(dst, message_type, None, &[])
}

fn to_vec(encode: impl FnOnce(&mut [u8]) -> Result<usize>) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let len = encode(&mut buf)?;
    buf.truncate(len);
    Ok(buf)
}

fn decode_tuple(src: &mut &[u8], arity: usize) -> Result<Tuple> {
    Tuple::new(codec::get_fields(src, arity)?)
}

/// Message sent by a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Deposit a data tuple
    SendTuple(Tuple),
    /// Ask for a tuple matching `template`
    GetTuple {
        /// Template, connection id first
        template: Tuple,
        /// Primitive selected by the request flags
        operation: Operation,
    },
    /// Acknowledge the last server response
    Received,
}

impl ClientMessage {
    /// Opcode of this message.
    pub fn opcode(&self) -> ClientOpcode {
        match self {
            Self::SendTuple(_) => ClientOpcode::SendTuple,
            Self::GetTuple { .. } => ClientOpcode::GetTuple,
            Self::Received => ClientOpcode::Received,
        }
    }

    /// Encode into `dst`, using its length as the byte budget.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BufferTooSmall`] if the message does not fit
    /// `dst`; see [`codec::encode_message`].
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        match self {
            Self::SendTuple(tuple) => encode_send_tuple(&TupleSpan::new(tuple), dst),
            Self::GetTuple { template, operation } => {
                encode_get_tuple(&TupleSpan::new(template), *operation, dst)
            },
            Self::Received => encode_control(ClientOpcode::Received.to_u8(), dst),
        }
    }

    /// Encode into a fresh buffer within [`MAX_DATAGRAM_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BufferTooSmall`] if the message exceeds one
    /// datagram.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_vec(|buf| self.encode_into(buf))
    }

    /// Decode one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EmptyDatagram`] for no bytes,
    /// [`ProtocolError::InvalidMessageType`] for an unknown type nibble and
    /// any field stream error from [`codec::get_fields`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&header, mut rest) = bytes.split_first().ok_or(ProtocolError::EmptyDatagram)?;
        let (message_type, arity) = codec::split_header(header);
        let opcode =
            ClientOpcode::from_u8(message_type).ok_or(ProtocolError::InvalidMessageType(message_type))?;

        match opcode {
            ClientOpcode::SendTuple => Ok(Self::SendTuple(decode_tuple(&mut rest, arity)?)),
            ClientOpcode::GetTuple => {
                let (&flags, mut fields) = rest
                    .split_first()
                    .ok_or(ProtocolError::Truncated { needed: 1, available: 0 })?;
                let operation = Operation::from_flags(GetFlags::from_bits_truncate(flags));
                let template = decode_tuple(&mut fields, arity)?;
                Ok(Self::GetTuple { template, operation })
            },
            ClientOpcode::Received => Ok(Self::Received),
        }
    }
}

/// Message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Matched tuple, connection id first
    Tuple(Tuple),
    /// Nothing matched a non-blocking request
    LackOfTuple,
    /// Acknowledgment
    Received,
    /// Request is queued; keep waiting
    AwaitingTuple,
}

impl ServerMessage {
    /// Opcode of this message.
    pub fn opcode(&self) -> ServerOpcode {
        match self {
            Self::Tuple(_) => ServerOpcode::Tuple,
            Self::LackOfTuple => ServerOpcode::LackOfTuple,
            Self::Received => ServerOpcode::Received,
            Self::AwaitingTuple => ServerOpcode::AwaitingTuple,
        }
    }

    /// Encode into `dst`, using its length as the byte budget.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BufferTooSmall`] if the message does not fit
    /// `dst`; see [`codec::encode_message`].
    pub fn encode_into(&self, dst: &mut [u8]) -> Result<usize> {
        match self {
            Self::Tuple(tuple) => encode_tuple_response(&TupleSpan::new(tuple), dst),
            other => encode_control(other.opcode().to_u8(), dst),
        }
    }

    /// Encode into a fresh buffer within [`MAX_DATAGRAM_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BufferTooSmall`] if the message exceeds one
    /// datagram.
    pub fn encode(&self) -> Result<Vec<u8>> {
        to_vec(|buf| self.encode_into(buf))
    }

    /// Decode one datagram.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::EmptyDatagram`] for no bytes,
    /// [`ProtocolError::InvalidMessageType`] for an unknown type nibble and
    /// any field stream error from [`codec::get_fields`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&header, mut rest) = bytes.split_first().ok_or(ProtocolError::EmptyDatagram)?;
        let (message_type, arity) = codec::split_header(header);
        let opcode =
            ServerOpcode::from_u8(message_type).ok_or(ProtocolError::InvalidMessageType(message_type))?;

        Ok(match opcode {
            ServerOpcode::Tuple => Self::Tuple(decode_tuple(&mut rest, arity)?),
            ServerOpcode::LackOfTuple => Self::LackOfTuple,
            ServerOpcode::Received => Self::Received,
            ServerOpcode::AwaitingTuple => Self::AwaitingTuple,
        })
    }
}
