//! # hkv-server
//!
//! The shard node: a TCP listener dispatching the shared command
//! grammar against one `hkv_engine::CacheEngine`.

pub mod server;

pub use server::run;
