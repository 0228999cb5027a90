//! # hkv-common
//!
//! Shared error types, the command grammar, the wire frame codec, and
//! performance-statistics types used by both the shard node
//! (`hkv-server`) and the coordinator (`hkv-coordinator`).

pub mod command;
pub mod error;
pub mod protocol;
pub mod stats;

pub use command::Command;
pub use error::{HkvError, HkvResult};
pub use stats::{Stats, StatsSnapshot};
