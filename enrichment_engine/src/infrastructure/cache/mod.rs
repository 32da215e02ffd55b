//! Multi-tier cache (§4.8): an in-process T1 tier (always present) plus
//! optional T2/T3 tiers reached through the domain's `CacheTier` port.

mod service;
mod tier1;

pub use service::{CacheHitTier, MultiTierCache};
pub use tier1::Tier1Cache;
