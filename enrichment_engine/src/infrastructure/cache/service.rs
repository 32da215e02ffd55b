use super::tier1::Tier1Cache;
use enrichment_domain::repositories::{CacheTier, CacheValue};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHitTier {
    T1,
    T2,
    T3,
}

/// Implements the `Get`/`Put` contract of §4.8 across all three tiers.
///
/// On a T2/T3 hit the value is written back into the faster tiers it missed
/// on, so the next lookup for the same key is a T1 hit. `Put` always writes
/// T1 and T2 (when present) synchronously with respect to this call; T3 is
/// intentionally not written here — §4.8 describes T3 writes as an
/// out-of-band batched background sync, which is a host-owned process this
/// cache does not implement on the request path.
pub struct MultiTierCache {
    t1: Tier1Cache,
    t2: Option<Arc<dyn CacheTier>>,
    t3: Option<Arc<dyn CacheTier>>,
}

impl MultiTierCache {
    pub fn new(max_t1_entries: usize, t2: Option<Arc<dyn CacheTier>>, t3: Option<Arc<dyn CacheTier>>) -> Self {
        MultiTierCache { t1: Tier1Cache::new(max_t1_entries), t2, t3 }
    }

    pub async fn get(&self, key: &str) -> Option<(CacheValue, CacheHitTier)> {
        if let Some(value) = self.t1.get(key) {
            return Some((value, CacheHitTier::T1));
        }

        if let Some(t2) = &self.t2 {
            if let Some(value) = t2.get(key).await {
                self.t1.put(key.to_string(), value.clone(), Duration::from_secs(300));
                return Some((value, CacheHitTier::T2));
            }
        }

        if let Some(t3) = &self.t3 {
            if let Some(value) = t3.get(key).await {
                self.t1.put(key.to_string(), value.clone(), Duration::from_secs(300));
                if let Some(t2) = &self.t2 {
                    t2.put(key, value.clone(), Duration::from_secs(3600)).await;
                }
                return Some((value, CacheHitTier::T3));
            }
        }

        None
    }

    pub async fn put(&self, key: &str, value: CacheValue, ttl: Duration) {
        self.t1.put(key.to_string(), value.clone(), ttl);
        if let Some(t2) = &self.t2 {
            t2.put(key, value, ttl).await;
        }
    }
}
