//! # riot-ratelimit
//!
//! A distributed, policy-adaptive rate limiter for the Riot Games API.
//! Keeps a fleet of client nodes below the upstream's three concurrently
//! enforced quota scopes using a shared Redis store.
//!
//! ## Features
//!
//! - **Header-Driven Policy**: quota rules are discovered lazily from
//!   response headers, never pre-configured
//! - **Three Scopes**: `application`, `method`, and `service` limits are
//!   honoured in a single decision
//! - **Atomic Admission**: multi-window check-and-increment runs as one
//!   linearisable Redis script, so concurrent nodes cannot over-admit
//! - **429 Aware**: server-issued `Retry-After` back-off dominates counter
//!   arithmetic, with clock-skew correction
//! - **Stateless Library**: all persistent state lives in Redis; process
//!   restart loses nothing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use riot_ratelimit::{Config, Decision, RateLimiter, RoutingVal};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("config/limiter.yaml").await?;
//!     let limiter = RateLimiter::from_config(&config).await?;
//!
//!     match limiter.hit(RoutingVal::Euw1, "/lol/summoner").await? {
//!         Decision::Allow(_) => {
//!             // issue the outbound call, then fold the response back in:
//!             // limiter.refresh(response.headers(), RoutingVal::Euw1, "/lol/summoner").await?;
//!         }
//!         Decision::Throttle(entries) => {
//!             println!("throttled for {:?}s", entries[0].ttl());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

// Public module exports
pub mod config;
pub mod limits;
pub mod storage;
pub mod utils;

// Re-export main types
pub use config::Config;
pub use limits::{
    Decision, EntrySource, LimitEntry, LimitType, RateLimiter, RoutingVal, StoreKey,
};
pub use storage::redis::RedisPool;
pub use utils::error::{LimiterError, Result};

// Version information
/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Name of the crate
pub const NAME: &str = env!("CARGO_PKG_NAME");
