//! # Shared Error Types
//!
//! One `HkvError` enum threaded through the cache engine, shard node,
//! and coordinator so each layer can match on the same failure kinds
//! instead of inventing its own per-crate error type.

use thiserror::Error;

/// Errors produced anywhere in the HybridKV stack.
#[derive(Debug, Error)]
pub enum HkvError {
    /// The command frame did not match the grammar in the wire protocol.
    #[error("Error: Invalid command")]
    InvalidCommand,

    /// `get` found no resident or overflowed entry for the key.
    #[error("Error: Non existent key")]
    NotFound,

    /// A request frame was not valid JSON, or not an array of strings.
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// A key or value contained characters outside `[A-Za-z0-9]+`.
    #[error("invalid key or value: {0}")]
    InvalidArgument(String),

    /// The disk overflow tier failed a read or write.
    #[error("disk overflow error: {0}")]
    Disk(#[from] std::io::Error),

    /// A shard connection could not be reached or dropped mid-request.
    #[error("shard connection error: {0}")]
    ShardUnavailable(String),
}

pub type HkvResult<T> = Result<T, HkvError>;
