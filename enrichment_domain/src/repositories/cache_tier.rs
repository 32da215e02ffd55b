use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// The whitelisted set of value shapes that may cross a cache tier boundary.
/// Deliberately a closed, data-only enum rather than `serde_json::Value`
/// passed through verbatim: it is the type system's enforcement of the
/// "never execute code paths derived from cached bytes" invariant (§4.8) —
/// a payload that does not fit one of these shapes cannot be constructed as
/// a `CacheValue` at all, whatever bytes produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<CacheValue>),
    Map(HashMap<String, CacheValue>),
}

/// Port for one remote or persistent cache tier (T2/T3 of §4.8). The T1
/// in-process tier has no trait — it is always the same `lru`-backed
/// implementation and lives in the engine crate's cache module.
#[async_trait]
pub trait CacheTier: Send + Sync {
    /// Returns `Ok(None)` on a miss. Returns `Ok(None)` (never `Err`) when
    /// the stored bytes fail to decode into a `CacheValue` — a corrupted
    /// entry is evicted and reported as a miss, per invariant 10 of §8, not
    /// surfaced as a retrievable error.
    async fn get(&self, key: &str) -> Option<CacheValue>;

    async fn put(&self, key: &str, value: CacheValue, ttl: Duration);
}
