//! Storage layer for the limiter
//!
//! All persistent state lives in the shared Redis store; process restart
//! loses nothing.

/// Redis store module
pub mod redis;

pub use redis::{CheckAndIncrReply, RedisPool};
