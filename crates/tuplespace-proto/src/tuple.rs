//! Tuples, templates and the matching rule.
//!
//! A [`Tuple`] owns between 1 and [`MAX_ARITY`] fields. The same type serves
//! as a data tuple (every field carries a value) and as a template (one or
//! more wildcards); [`Tuple::is_data`] tells them apart.
//!
//! [`TupleSpan`] is the borrowed counterpart: a list of field references
//! that encodes exactly like a tuple. The client uses it to put its
//! connection id in front of a caller's tuple without copying the fields.

use std::fmt;

use crate::{
    errors::{ProtocolError, Result},
    field::Field,
};

/// Largest number of fields in a tuple (the header keeps `arity - 1` in four
/// bits).
pub const MAX_ARITY: usize = 16;

fn check_arity(arity: usize) -> Result<()> {
    if (1..=MAX_ARITY).contains(&arity) {
        Ok(())
    } else {
        Err(ProtocolError::ArityOutOfRange(arity))
    }
}

/// Ordered, fixed-length sequence of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    fields: Vec<Field>,
}

impl Tuple {
    /// Build a tuple, rejecting arities outside `1..=16`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ArityOutOfRange`] for an empty field list or
    /// more than [`MAX_ARITY`] fields.
    ///
    /// ```
    /// use tuplespace_proto::{Field, ProtocolError, Tuple};
    ///
    /// assert!(Tuple::new(vec![Field::uint(1); 16]).is_ok());
    /// assert_eq!(Tuple::new(vec![Field::uint(1); 17]), Err(ProtocolError::ArityOutOfRange(17)));
    /// ```
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        check_arity(fields.len())?;
        Ok(Self { fields })
    }

    /// Number of fields.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// All fields, in order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field at `index`.
    pub fn get(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Consume the tuple and return its fields.
    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }

    /// True when every field carries a value.
    pub fn is_data(&self) -> bool {
        self.fields.iter().all(Field::contains_data)
    }

    /// True when this tuple, read as a template, matches `data`.
    ///
    /// Arities must agree, every position must have the same type, and every
    /// data-carrying template position must equal the data value.
    pub fn matches(&self, data: &Self) -> bool {
        self.arity() == data.arity()
            && self.fields.iter().zip(&data.fields).all(|(template, field)| template.matches(field))
    }

    /// Split off the first field. Fails if nothing would remain.
    pub fn split_first(self) -> Result<(Field, Self)> {
        let mut fields = self.fields;
        if fields.len() < 2 {
            return Err(ProtocolError::ArityOutOfRange(fields.len().saturating_sub(1)));
        }
        let head = fields.remove(0);
        Ok((head, Self { fields }))
    }
}

impl<'a> IntoIterator for &'a Tuple {
    type IntoIter = std::slice::Iter<'a, Field>;
    type Item = &'a Field;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.fields.iter())
    }
}

fn write_fields<'a>(
    f: &mut fmt::Formatter<'_>,
    fields: impl Iterator<Item = &'a Field>,
) -> fmt::Result {
    f.write_str("(")?;
    for (i, field) in fields.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{field}")?;
    }
    f.write_str(")")
}

/// Borrowed view over fields that may come from several places.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleSpan<'a> {
    fields: Vec<&'a Field>,
}

impl<'a> TupleSpan<'a> {
    /// View over an owned tuple.
    pub fn new(tuple: &'a Tuple) -> Self {
        Self { fields: tuple.fields.iter().collect() }
    }

    /// View over `prefix` followed by every field of `tuple`.
    pub fn prefixed(prefix: &'a Field, tuple: &'a Tuple) -> Result<Self> {
        check_arity(tuple.arity() + 1)?;
        let mut fields = Vec::with_capacity(tuple.arity() + 1);
        fields.push(prefix);
        fields.extend(tuple.fields.iter());
        Ok(Self { fields })
    }

    /// Number of fields.
    pub fn arity(&self) -> usize {
        self.fields.len()
    }

    /// Iterate the referenced fields.
    pub fn iter(&self) -> impl Iterator<Item = &'a Field> + '_ {
        self.fields.iter().copied()
    }

    /// True when every referenced field carries a value.
    pub fn is_data(&self) -> bool {
        self.fields.iter().all(|field| field.contains_data())
    }

    /// Copy the referenced fields into an owned tuple.
    pub fn to_tuple(&self) -> Tuple {
        Tuple { fields: self.fields.iter().map(|&field| field.clone()).collect() }
    }
}

impl fmt::Display for TupleSpan<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_fields(f, self.fields.iter().copied())
    }
}
