//! Logging utilities
//!
//! Thin tracing-subscriber setup for binaries and tests embedding the
//! limiter; library code logs through `tracing` macros only.

use tracing::Level;

/// Initialize the global tracing subscriber
///
/// Safe to call once per process; later calls are ignored.
pub fn init_logging(level: Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}
