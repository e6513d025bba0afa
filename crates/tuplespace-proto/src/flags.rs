//! `GET_TUPLE` request flags.
//!
//! The byte after a `GET_TUPLE` header carries two bits. Their four
//! combinations are the four Linda read primitives:
//!
//! | bits | operation | consumes | blocks |
//! |------|-----------|----------|--------|
//! | `11` | `in`      | yes      | yes    |
//! | `01` | `inp`     | yes      | no     |
//! | `10` | `rd`      | no       | yes    |
//! | `00` | `rdp`     | no       | no     |
//!
//! Unknown bits are ignored on decode.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Flag byte of a `GET_TUPLE` request.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct GetFlags: u8 {
        /// Remove the matched tuple from the stash
        const REMOVE_AFTER_USE = 0b0000_0001;
        /// Queue the request until a tuple is available
        const RESPOND_WHEN_AVAILABLE = 0b0000_0010;
    }
}

/// Template operation selected by [`GetFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Blocking take
    In,
    /// Non-blocking take
    Inp,
    /// Blocking read
    Rd,
    /// Non-blocking read
    Rdp,
}

impl Operation {
    /// Every operation.
    pub const ALL: [Self; 4] = [Self::In, Self::Inp, Self::Rd, Self::Rdp];

    /// Decode from request flags.
    pub fn from_flags(flags: GetFlags) -> Self {
        match (
            flags.contains(GetFlags::REMOVE_AFTER_USE),
            flags.contains(GetFlags::RESPOND_WHEN_AVAILABLE),
        ) {
            (true, true) => Self::In,
            (true, false) => Self::Inp,
            (false, true) => Self::Rd,
            (false, false) => Self::Rdp,
        }
    }

    /// Encode as request flags.
    pub fn flags(self) -> GetFlags {
        match self {
            Self::In => GetFlags::REMOVE_AFTER_USE | GetFlags::RESPOND_WHEN_AVAILABLE,
            Self::Inp => GetFlags::REMOVE_AFTER_USE,
            Self::Rd => GetFlags::RESPOND_WHEN_AVAILABLE,
            Self::Rdp => GetFlags::empty(),
        }
    }

    /// Whether the matched tuple leaves the stash.
    pub fn removes(self) -> bool {
        matches!(self, Self::In | Self::Inp)
    }

    /// Whether a miss queues the request instead of answering "lack of tuple".
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::In | Self::Rd)
    }

    /// Lowercase primitive name.
    pub fn name(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Inp => "inp",
            Self::Rd => "rd",
            Self::Rdp => "rdp",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
