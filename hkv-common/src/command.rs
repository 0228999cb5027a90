//! # Command Grammar
//!
//! Parses one line of the command grammar shared by the shard node and
//! the coordinator (the coordinator needs to know which key a `set`/
//! `get` touches in order to route it, without re-executing it).

use crate::error::HkvError;
use crate::protocol::is_valid_token;

/// One parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set { key: String, value: String },
    Get { key: String },
    Stats,
}

impl Command {
    /// Returns the routing key for single-key commands, or `None` for
    /// cluster-wide commands like `stats`.
    pub fn routing_key(&self) -> Option<&str> {
        match self {
            Command::Set { key, .. } | Command::Get { key } => Some(key),
            Command::Stats => None,
        }
    }
}

/// Parses one command line against the anchored grammar:
/// `set <KEY> <VALUE>`, `get <KEY>`, or `stats`. Whitespace outside the
/// prescribed single spaces is a parse failure.
pub fn parse(line: &str) -> Result<Command, HkvError> {
    let parts: Vec<&str> = line.split(' ').collect();
    match parts.as_slice() {
        ["set", key, value] if is_valid_token(key) && is_valid_token(value) => {
            Ok(Command::Set {
                key: (*key).to_string(),
                value: (*value).to_string(),
            })
        }
        ["get", key] if is_valid_token(key) => Ok(Command::Get {
            key: (*key).to_string(),
        }),
        ["stats"] => Ok(Command::Stats),
        _ => Err(HkvError::InvalidCommand),
    }
}
