//! Utility modules for the rate limiter
//!
//! ## Module Organization
//!
//! - **error**: Error types and the crate-wide Result alias
//! - **logging**: Tracing subscriber setup

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{LimiterError, Result};
pub use logging::init_logging;
