//! Line-oriented tuple space client.
//!
//! [`commands::parse`] turns one input line into a [`Command`];
//! [`literal::parse_tuple`] reads the tuple literal syntax that
//! `Display` on [`tuplespace_proto::Tuple`] writes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod commands;
pub mod literal;

pub use commands::{Command, parse};
pub use literal::{LiteralError, parse_tuple};
