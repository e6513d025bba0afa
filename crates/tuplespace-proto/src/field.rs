//! Typed tuple fields.
//!
//! A [`Field`] is either a concrete [`Value`] or a type-only wildcard. The
//! wire format packs the same information into one flags byte:
//!
//! ```text
//!   7   6   5 . . . . . 0
//! +---+---+---------------+
//! | D | B |   type tag    |
//! +---+---+---------------+
//!  D = contains data, B = boolean value
//! ```
//!
//! Keeping the two cases in separate enum variants means a wildcard can never
//! be read for a value; the accessors return [`FieldAccessError::Wildcard`]
//! instead.

use std::fmt;

use crate::errors::{FieldAccessError, ProtocolError};

/// Flags bit set when the field carries a payload.
pub const CONTAINS_DATA_BIT: u8 = 0x80;

/// Flags bit holding the value of a boolean field.
pub const BOOL_VALUE_BIT: u8 = 0x40;

/// Mask for the 6-bit type tag.
pub const TYPE_TAG_MASK: u8 = 0x3f;

/// Type tag of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum FieldType {
    /// Unsigned 32-bit integer
    Uint = 1,
    /// Signed 32-bit integer
    Int = 2,
    /// 32-bit IEEE float
    Float = 3,
    /// Length-prefixed UTF-8 string
    String = 4,
    /// Boolean folded into the flags byte
    Bool = 5,
}

impl FieldType {
    /// All field types, in tag order.
    pub const ALL: [Self; 5] = [Self::Uint, Self::Int, Self::Float, Self::String, Self::Bool];

    /// Wire tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag. Tag 0 and anything above 5 is reserved.
    pub fn from_tag(tag: u8) -> Result<Self, ProtocolError> {
        match tag {
            1 => Ok(Self::Uint),
            2 => Ok(Self::Int),
            3 => Ok(Self::Float),
            4 => Ok(Self::String),
            5 => Ok(Self::Bool),
            other => Err(ProtocolError::InvalidFieldType(other)),
        }
    }

    /// One-letter suffix used by the tuple literal syntax.
    pub const fn suffix(self) -> char {
        match self {
            Self::Uint => 'u',
            Self::Int => 'i',
            Self::Float => 'f',
            Self::String => 's',
            Self::Bool => 'b',
        }
    }

    /// Inverse of [`FieldType::suffix`].
    pub const fn from_suffix(suffix: char) -> Option<Self> {
        match suffix {
            'u' => Some(Self::Uint),
            'i' => Some(Self::Int),
            'f' => Some(Self::Float),
            's' => Some(Self::String),
            'b' => Some(Self::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uint => "uint",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// Concrete field payload.
#[derive(Debug, Clone)]
pub enum Value {
    /// Unsigned 32-bit integer
    Uint(u32),
    /// Signed 32-bit integer
    Int(i32),
    /// 32-bit float, compared bitwise
    Float(f32),
    /// Boolean
    Bool(bool),
    /// String, compared by byte content
    String(String),
}

impl Value {
    /// Type tag of this value.
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Uint(_) => FieldType::Uint,
            Self::Int(_) => FieldType::Int,
            Self::Float(_) => FieldType::Float,
            Self::Bool(_) => FieldType::Bool,
            Self::String(_) => FieldType::String,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Uint(a), Self::Uint(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Bitwise so that NaN payloads match themselves.
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::String(a), Self::String(b)) => a.as_bytes() == b.as_bytes(),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}u"),
            Self::Int(v) => write!(f, "{v}i"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::String(v) => write!(f, "{v:?}"),
        }
    }
}

/// One position of a tuple or template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    /// Field with data
    Value(Value),
    /// Type-constrained, value-unconstrained template slot
    Wildcard(FieldType),
}

impl Field {
    /// Build a field from a value and a contains-data flag.
    ///
    /// With `contains_data == false` the value is discarded and only its type
    /// is kept.
    pub fn from_value(value: Value, contains_data: bool) -> Self {
        if contains_data { Self::Value(value) } else { Self::Wildcard(value.field_type()) }
    }

    /// Unsigned integer field.
    pub const fn uint(value: u32) -> Self {
        Self::Value(Value::Uint(value))
    }

    /// Signed integer field.
    pub const fn int(value: i32) -> Self {
        Self::Value(Value::Int(value))
    }

    /// Float field.
    pub const fn float(value: f32) -> Self {
        Self::Value(Value::Float(value))
    }

    /// Boolean field.
    pub const fn bool(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }

    /// String field.
    pub fn string(value: impl Into<String>) -> Self {
        Self::Value(Value::String(value.into()))
    }

    /// Wildcard of the given type.
    pub const fn wildcard(field_type: FieldType) -> Self {
        Self::Wildcard(field_type)
    }

    /// Type tag, defined for values and wildcards alike.
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::Value(value) => value.field_type(),
            Self::Wildcard(field_type) => *field_type,
        }
    }

    /// Whether the field carries data.
    pub const fn contains_data(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Payload, if any.
    pub const fn value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Wildcard(_) => None,
        }
    }

    /// Template rule for a single position: types must agree, and a
    /// data-carrying template field must equal the data field.
    pub fn matches(&self, data: &Self) -> bool {
        if self.field_type() != data.field_type() {
            return false;
        }
        match (self, data) {
            (Self::Wildcard(_), _) => true,
            (Self::Value(expected), Self::Value(actual)) => expected == actual,
            (Self::Value(_), Self::Wildcard(_)) => false,
        }
    }

    /// Flags byte as written on the wire.
    pub fn flags_byte(&self) -> u8 {
        match self {
            Self::Wildcard(field_type) => field_type.tag(),
            Self::Value(Value::Bool(true)) => CONTAINS_DATA_BIT | BOOL_VALUE_BIT | FieldType::Bool.tag(),
            Self::Value(value) => CONTAINS_DATA_BIT | value.field_type().tag(),
        }
    }

    fn checked(&self, expected: FieldType) -> Result<&Value, FieldAccessError> {
        match self {
            Self::Value(value) if value.field_type() == expected => Ok(value),
            Self::Value(value) => {
                Err(FieldAccessError::TypeMismatch { expected, actual: value.field_type() })
            },
            Self::Wildcard(actual) if *actual == expected => Err(FieldAccessError::Wildcard(*actual)),
            Self::Wildcard(actual) => {
                Err(FieldAccessError::TypeMismatch { expected, actual: *actual })
            },
        }
    }

    /// Read an unsigned integer.
    pub fn as_uint(&self) -> Result<u32, FieldAccessError> {
        match self.checked(FieldType::Uint)? {
            Value::Uint(v) => Ok(*v),
            other => Err(mismatch(FieldType::Uint, other)),
        }
    }

    /// Read a signed integer.
    pub fn as_int(&self) -> Result<i32, FieldAccessError> {
        match self.checked(FieldType::Int)? {
            Value::Int(v) => Ok(*v),
            other => Err(mismatch(FieldType::Int, other)),
        }
    }

    /// Read a float.
    pub fn as_float(&self) -> Result<f32, FieldAccessError> {
        match self.checked(FieldType::Float)? {
            Value::Float(v) => Ok(*v),
            other => Err(mismatch(FieldType::Float, other)),
        }
    }

    /// Read a boolean.
    pub fn as_bool(&self) -> Result<bool, FieldAccessError> {
        match self.checked(FieldType::Bool)? {
            Value::Bool(v) => Ok(*v),
            other => Err(mismatch(FieldType::Bool, other)),
        }
    }

    /// Borrow a string.
    pub fn as_str(&self) -> Result<&str, FieldAccessError> {
        match self.checked(FieldType::String)? {
            Value::String(v) => Ok(v),
            other => Err(mismatch(FieldType::String, other)),
        }
    }
}

fn mismatch(expected: FieldType, value: &Value) -> FieldAccessError {
    FieldAccessError::TypeMismatch { expected, actual: value.field_type() }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => value.fmt(f),
            Self::Wildcard(field_type) => write!(f, "?{}", field_type.suffix()),
        }
    }
}
