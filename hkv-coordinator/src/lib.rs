//! # hkv-coordinator
//!
//! Routes client commands to shard nodes by consistent hashing and
//! aggregates cluster-wide `stats`.

pub mod coordinator;
pub mod ring;
pub mod shard_conn;

pub use coordinator::run;
pub use ring::Ring;
pub use shard_conn::ShardConnection;
