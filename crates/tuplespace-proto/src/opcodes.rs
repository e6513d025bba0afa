//! Message type discriminants.
//!
//! The low nibble of the first datagram byte selects the message type. The
//! two directions use separate numbering, so the same nibble means different
//! things depending on who sent it.

/// Client to server message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ClientOpcode {
    /// Deposit a data tuple (`out`)
    SendTuple = 1,
    /// Template request (`in`, `inp`, `rd`, `rdp`)
    GetTuple = 2,
    /// Acknowledge a server response
    Received = 3,
}

impl ClientOpcode {
    /// Convert from the header nibble.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::SendTuple),
            2 => Some(Self::GetTuple),
            3 => Some(Self::Received),
            _ => None,
        }
    }

    /// Convert to the header nibble.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Server to client message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServerOpcode {
    /// A matched data tuple
    Tuple = 1,
    /// Nothing matched a non-blocking request
    LackOfTuple = 2,
    /// Acknowledgment
    Received = 3,
    /// Keep-alive for a queued blocking request
    AwaitingTuple = 4,
}

impl ServerOpcode {
    /// Convert from the header nibble.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Tuple),
            2 => Some(Self::LackOfTuple),
            3 => Some(Self::Received),
            4 => Some(Self::AwaitingTuple),
            _ => None,
        }
    }

    /// Convert to the header nibble.
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}
