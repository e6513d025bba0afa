//! Field stream encoding.
//!
//! ```text
//! byte 0        : [ arity-1 : 4 | type : 4 ]
//! byte 1 (GET)  : request flags
//! then, per field:
//!   flags byte  : [ D | B | tag : 6 ]
//!   payload     : uint/int/float -> 4 bytes LE
//!                 string         -> u16 LE length, raw bytes
//!                 bool, wildcard -> nothing
//! ```
//!
//! Encoders compute the exact length first and refuse to write a single byte
//! when it exceeds the destination. Decoders check every read against the
//! remaining input, so a truncated datagram yields an error instead of a
//! partially built tuple.

use bytes::{Buf, BufMut};

use crate::{
    errors::{ProtocolError, Result},
    field::{BOOL_VALUE_BIT, CONTAINS_DATA_BIT, Field, FieldType, TYPE_TAG_MASK, Value},
    tuple::MAX_ARITY,
};

/// Datagram byte budget shared by client and server.
pub const MAX_DATAGRAM_SIZE: usize = 256;

/// Compose a header byte from a type nibble and an arity.
///
/// Arity is only meaningful for messages carrying a tuple; control messages
/// pass 1 so the high nibble stays zero.
pub fn header_byte(message_type: u8, arity: usize) -> u8 {
    let arity_bits = (arity.clamp(1, MAX_ARITY) - 1) as u8;
    (arity_bits << 4) | (message_type & 0x0f)
}

/// Split a header byte into its type nibble and declared arity.
pub fn split_header(byte: u8) -> (u8, usize) {
    (byte & 0x0f, usize::from(byte >> 4) + 1)
}

/// Encoded size of one field.
pub fn field_len(field: &Field) -> usize {
    1 + match field {
        Field::Wildcard(_) | Field::Value(Value::Bool(_)) => 0,
        Field::Value(Value::Uint(_) | Value::Int(_) | Value::Float(_)) => 4,
        Field::Value(Value::String(s)) => 2 + s.len(),
    }
}

/// Encoded size of a field stream.
pub fn fields_len<'a>(fields: impl IntoIterator<Item = &'a Field>) -> usize {
    fields.into_iter().map(field_len).sum()
}

/// Write one field. The caller has already checked capacity.
///
/// # Errors
///
/// Returns [`ProtocolError::StringTooLong`] if a string value needs more
/// than a `u16` length prefix.
pub fn put_field<B: BufMut>(dst: &mut B, field: &Field) -> Result<()> {
    dst.put_u8(field.flags_byte());
    match field {
        Field::Wildcard(_) | Field::Value(Value::Bool(_)) => {},
        Field::Value(Value::Uint(v)) => dst.put_u32_le(*v),
        Field::Value(Value::Int(v)) => dst.put_i32_le(*v),
        Field::Value(Value::Float(v)) => dst.put_f32_le(*v),
        Field::Value(Value::String(s)) => {
            let len = u16::try_from(s.len()).map_err(|_| ProtocolError::StringTooLong(s.len()))?;
            dst.put_u16_le(len);
            dst.put_slice(s.as_bytes());
        },
    }
    Ok(())
}

/// Write a complete message: header, optional flag byte, field stream.
///
/// Returns the number of bytes written.
///
/// # Errors
///
/// Returns [`ProtocolError::BufferTooSmall`] without touching `dst` if the
/// message does not fit, [`ProtocolError::ArityOutOfRange`] for more than
/// [`MAX_ARITY`] fields and [`ProtocolError::StringTooLong`] for a string
/// that cannot be length-prefixed.
pub fn encode_message(
    dst: &mut [u8],
    message_type: u8,
    extra: Option<u8>,
    fields: &[&Field],
) -> Result<usize> {
    if fields.len() > MAX_ARITY {
        return Err(ProtocolError::ArityOutOfRange(fields.len()));
    }
    for field in fields {
        if let Field::Value(Value::String(s)) = field
            && s.len() > usize::from(u16::MAX)
        {
            return Err(ProtocolError::StringTooLong(s.len()));
        }
    }

    let needed = 1 + usize::from(extra.is_some()) + fields_len(fields.iter().copied());
    if needed > dst.len() {
        return Err(ProtocolError::BufferTooSmall { needed, available: dst.len() });
    }

    let mut cursor = &mut dst[..needed];
    cursor.put_u8(header_byte(message_type, fields.len()));
    if let Some(byte) = extra {
        cursor.put_u8(byte);
    }
    for field in fields {
        put_field(&mut cursor, field)?;
    }
    Ok(needed)
}

fn need(src: &[u8], needed: usize) -> Result<()> {
    if src.remaining() < needed {
        Err(ProtocolError::Truncated { needed, available: src.remaining() })
    } else {
        Ok(())
    }
}

/// Read one field, advancing `src`.
///
/// # Errors
///
/// Returns [`ProtocolError::Truncated`] if the input ends inside the field,
/// [`ProtocolError::InvalidFieldType`] for an unknown type tag and
/// [`ProtocolError::InvalidUtf8`] for a string that is not UTF-8.
pub fn get_field(src: &mut &[u8]) -> Result<Field> {
    need(src, 1)?;
    let flags = src.get_u8();
    let field_type = FieldType::from_tag(flags & TYPE_TAG_MASK)?;
    if flags & CONTAINS_DATA_BIT == 0 {
        return Ok(Field::Wildcard(field_type));
    }

    let value = match field_type {
        FieldType::Bool => Value::Bool(flags & BOOL_VALUE_BIT != 0),
        FieldType::Uint => {
            need(src, 4)?;
            Value::Uint(src.get_u32_le())
        },
        FieldType::Int => {
            need(src, 4)?;
            Value::Int(src.get_i32_le())
        },
        FieldType::Float => {
            need(src, 4)?;
            Value::Float(src.get_f32_le())
        },
        FieldType::String => {
            need(src, 2)?;
            let len = usize::from(src.get_u16_le());
            need(src, len)?;
            let text = std::str::from_utf8(&src[..len])
                .map_err(|_| ProtocolError::InvalidUtf8)?
                .to_owned();
            src.advance(len);
            Value::String(text)
        },
    };
    Ok(Field::Value(value))
}

/// Read `arity` fields, advancing `src`. Bytes after the last field are left
/// in place.
///
/// # Errors
///
/// Returns [`ProtocolError::ArityOutOfRange`] unless `arity` is within
/// `1..=MAX_ARITY`, and any error from [`get_field`].
pub fn get_fields(src: &mut &[u8], arity: usize) -> Result<Vec<Field>> {
    if !(1..=MAX_ARITY).contains(&arity) {
        return Err(ProtocolError::ArityOutOfRange(arity));
    }
    let mut fields = Vec::with_capacity(arity);
    for _ in 0..arity {
        fields.push(get_field(src)?);
    }
    Ok(fields)
}
