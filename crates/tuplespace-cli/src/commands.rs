//! Command parsing for the line-oriented client.
//!
//! One command per line: an operation name followed by a tuple literal,
//! for example `out (1u, "x")` or `in (?u, "x")`.

use std::fmt;

use tuplespace_proto::{Operation, Tuple};

use crate::literal::{LiteralError, parse_tuple};

/// Parsed command from user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Deposit a data tuple.
    Out {
        /// Tuple to deposit.
        tuple: Tuple,
    },

    /// Run a template request.
    Get {
        /// Which of `in`, `inp`, `rd`, `rdp`.
        operation: Operation,
        /// Template to match.
        template: Tuple,
    },

    /// Show the command summary.
    Help,

    /// Quit the client.
    Quit,

    /// Blank line.
    Empty,

    /// Unknown command name.
    Unknown {
        /// The original input.
        input: String,
    },

    /// Command with a missing or malformed tuple.
    InvalidArgs {
        /// Command name.
        command: String,
        /// Error message.
        error: String,
    },
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Out { tuple } => write!(f, "out {tuple}"),
            Self::Get { operation, template } => write!(f, "{operation} {template}"),
            Self::Help => f.write_str("help"),
            Self::Quit => f.write_str("quit"),
            Self::Empty => Ok(()),
            Self::Unknown { input } => write!(f, "unknown command: {input}"),
            Self::InvalidArgs { command, error } => write!(f, "{command}: {error}"),
        }
    }
}

/// Command summary printed by `help`.
pub const HELP: &str = "\
out (42u, \"x\")   deposit a tuple
in  (?u, \"x\")    remove a matching tuple, waiting for one
inp (?u, \"x\")    remove a matching tuple if there is one
rd  (?u, \"x\")    read a matching tuple, waiting for one
rdp (?u, \"x\")    read a matching tuple if there is one
quit             exit
fields: 42u  -3i  1.5f  true  \"text\"  wildcards: ?u ?i ?f ?b ?s";

/// Parse one input line.
pub fn parse(input: &str) -> Command {
    let input = input.trim();
    if input.is_empty() {
        return Command::Empty;
    }

    let (name, rest) = input.split_once(|c: char| c.is_whitespace() || c == '(').map_or(
        (input, ""),
        |(name, _)| (name, &input[name.len()..]),
    );

    match name {
        "quit" | "q" | "exit" => Command::Quit,
        "help" | "?" => Command::Help,
        "out" => match parse_args(name, rest) {
            Ok(tuple) => Command::Out { tuple },
            Err(invalid) => invalid,
        },
        _ => match Operation::ALL.into_iter().find(|op| op.name() == name) {
            Some(operation) => match parse_args(name, rest) {
                Ok(template) => Command::Get { operation, template },
                Err(invalid) => invalid,
            },
            None => Command::Unknown { input: input.to_owned() },
        },
    }
}

fn parse_args(command: &str, rest: &str) -> Result<Tuple, Command> {
    if rest.trim().is_empty() {
        return Err(Command::InvalidArgs {
            command: command.into(),
            error: format!("Usage: {command} (<field>, ...)"),
        });
    }
    parse_tuple(rest).map_err(|error: LiteralError| Command::InvalidArgs {
        command: command.into(),
        error: error.to_string(),
    })
}
