//! Rate limit subsystem
//!
//! Policy discovery from response headers, distributed counter arithmetic
//! against the shared store, cooldown bookkeeping, and the atomic
//! admission/throttle decision.
//!
//! ## Module Structure
//!
//! - `routing` - Routing value sum type
//! - `entry` - LimitEntry, the record exchanged between components
//! - `keys` - Store key codec
//! - `headers` - Upstream response header parsing
//! - `policy` - Policy bootstrap, reads, and atomic admission
//! - `cooldown` - Server-imposed back-off bookkeeping
//! - `limiter` - The two-operation façade (`hit` / `refresh`)

pub mod cooldown;
pub mod entry;
pub mod headers;
pub mod keys;
pub mod limiter;
pub mod policy;
pub mod routing;

pub use cooldown::CooldownStore;
pub use entry::{EntrySource, LimitEntry, LimitEntryBuilder, LimitType};
pub use keys::{KeyKind, StoreKey};
pub use limiter::RateLimiter;
pub use policy::PolicyStore;
pub use routing::RoutingVal;

/// Outcome of an admission or cooldown check
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The call may proceed; entries describe the counters consulted
    Allow(Vec<LimitEntry>),
    /// The call must wait; entries describe what blocked it
    Throttle(Vec<LimitEntry>),
}

impl Decision {
    /// True when the call may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }

    /// The entries backing this decision
    pub fn entries(&self) -> &[LimitEntry] {
        match self {
            Decision::Allow(entries) | Decision::Throttle(entries) => entries,
        }
    }

    /// Consume the decision, yielding its entries
    pub fn into_entries(self) -> Vec<LimitEntry> {
        match self {
            Decision::Allow(entries) | Decision::Throttle(entries) => entries,
        }
    }
}
