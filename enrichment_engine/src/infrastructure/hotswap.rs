//! Concrete hot-swap manager.
//!
//! Grounded on the teacher's `Arc<RwLock<...>>`-guarded shared-state style
//! (`infrastructure/runtime/stage_executor.rs`), generalized from a
//! checksum-per-chunk map to a component-slot-per-id table. The table is the
//! single authoritative owner of slot state; active-request counts are
//! plain `u32`s mutated under the same lock rather than free-standing
//! atomics, since every mutation already needs the lock to find the slot.
//!
//! Slots are keyed by a generation-stamped key (`"{id}@{generation}"`), not
//! by the bare logical id. A swap installs the new instance under a fresh
//! generation and only repoints the logical id to it; the old, `DRAINING`
//! slot keeps living in the table under its own generation key until every
//! lease acquired against it has released. Leases remember the generation
//! key they were issued against, so `release()` always finds the exact
//! physical slot regardless of swaps that happen while the lease is held —
//! a later swap can never cause a release to land on the wrong slot.

use async_trait::async_trait;
use enrichment_domain::entities::{ComponentDescriptor, ComponentKind, SlotState};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::services::{ComponentLease, HotSwapManager, ReleaseHandle};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

struct Slot<T: ?Sized> {
    descriptor: ComponentDescriptor,
    instance: Arc<T>,
    state: SlotState,
    active_requests: u32,
}

fn generation_key(id: &str, generation: u64) -> String {
    format!("{id}@{generation}")
}

/// Health check run against a freshly-loaded candidate before it may become
/// `READY`. `true` promotes the slot; `false` rolls it back to `RETIRED`
/// without ever serving a request.
#[async_trait]
pub trait HealthCheck<T: Send + Sync + 'static + ?Sized>: Send + Sync {
    async fn check(&self, instance: &T) -> bool;
}

/// A health check that always passes, for components with no meaningful
/// warm-up probe.
pub struct AlwaysHealthy;

#[async_trait]
impl<T: Send + Sync + 'static + ?Sized> HealthCheck<T> for AlwaysHealthy {
    async fn check(&self, _instance: &T) -> bool {
        true
    }
}

/// Holds the slot table and doubles as the [`ReleaseHandle`] leases call
/// back into on drop. Split from [`InMemoryHotSwapManager`] so the manager
/// can clone an `Arc<Inner<T>>` into every lease it hands out instead of
/// needing the manager itself to already be wrapped in an `Arc`.
struct Inner<T: Send + Sync + 'static + ?Sized> {
    kind: ComponentKind,
    /// All slots, keyed by generation key. A retired slot is left in place
    /// rather than swept — it carries no live lease by definition, and the
    /// manager's lifetime is the process's, so this never grows unbounded
    /// in practice (swaps are rare relative to requests).
    slots: RwLock<HashMap<String, Slot<T>>>,
    /// Logical component id -> the generation key currently serving it.
    /// `acquire`, `register`, and swap all resolve through this map; only
    /// `release` (holding a lease's own captured generation key) bypasses
    /// it and goes straight to `slots`.
    active: RwLock<HashMap<String, String>>,
    candidates: RwLock<HashMap<String, Slot<T>>>,
    next_generation: AtomicU64,
    health_check: Arc<dyn HealthCheck<T>>,
}

impl<T: Send + Sync + 'static + ?Sized> ReleaseHandle for Inner<T> {
    fn release(&self, kind: ComponentKind, slot_key: &str) {
        debug_assert_eq!(kind, self.kind);
        let mut slots = self.slots.write();
        if let Some(slot) = slots.get_mut(slot_key) {
            slot.active_requests = slot.active_requests.saturating_sub(1);
            if slot.state == SlotState::Draining && slot.active_requests == 0 {
                slot.state = SlotState::Retired;
                info!(slot_key, kind = %kind, "component slot retired");
            }
        }
    }
}

pub struct InMemoryHotSwapManager<T: Send + Sync + 'static + ?Sized> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static + ?Sized> InMemoryHotSwapManager<T> {
    pub fn new(kind: ComponentKind, health_check: Arc<dyn HealthCheck<T>>) -> Self {
        InMemoryHotSwapManager {
            inner: Arc::new(Inner {
                kind,
                slots: RwLock::new(HashMap::new()),
                active: RwLock::new(HashMap::new()),
                candidates: RwLock::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                health_check,
            }),
        }
    }
}

#[async_trait]
impl<T: Send + Sync + 'static + ?Sized> HotSwapManager<T> for InMemoryHotSwapManager<T> {
    async fn register(
        &self,
        descriptor: ComponentDescriptor,
        instance: Arc<T>,
    ) -> Result<(), EnrichmentError> {
        let id = descriptor.id.clone();
        let healthy = self.inner.health_check.check(&instance).await;
        let state = if healthy { SlotState::Ready } else { SlotState::Retired };
        if healthy {
            info!(component_id = %id, kind = %self.inner.kind, "component registered and ready");
        } else {
            warn!(component_id = %id, kind = %self.inner.kind, "component failed health check, retired");
        }
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let key = generation_key(&id, generation);
        self.inner.slots.write().insert(key.clone(), Slot { descriptor, instance, state, active_requests: 0 });
        self.inner.active.write().insert(id, key);
        Ok(())
    }

    fn acquire(&self, id: &str) -> Option<ComponentLease<T>> {
        let key = self.inner.active.read().get(id)?.clone();
        let mut slots = self.inner.slots.write();
        let slot = slots.get_mut(&key)?;
        if slot.state != SlotState::Ready {
            return None;
        }
        slot.active_requests += 1;
        let handle: Arc<dyn ReleaseHandle> = self.inner.clone();
        Some(ComponentLease::new(slot.instance.clone(), self.inner.kind, key, handle))
    }

    async fn prepare_swap(
        &self,
        id: &str,
        candidate: Arc<T>,
        version: String,
    ) -> Result<bool, EnrichmentError> {
        let healthy = self.inner.health_check.check(&candidate).await;
        if !healthy {
            warn!(component_id = %id, version = %version, "swap candidate failed health check");
            return Ok(false);
        }
        let Some(active_key) = self.inner.active.read().get(id).cloned() else {
            return Ok(false);
        };
        let mut descriptor = {
            let slots = self.inner.slots.read();
            let Some(existing) = slots.get(&active_key) else {
                return Ok(false);
            };
            existing.descriptor.clone()
        };
        descriptor.version = version;
        self.inner.candidates.write().insert(
            id.to_string(),
            Slot { descriptor, instance: candidate, state: SlotState::Loading, active_requests: 0 },
        );
        Ok(true)
    }

    async fn execute_swap(&self, id: &str, grace_period: Duration) -> Result<(), EnrichmentError> {
        let candidate = self
            .inner
            .candidates
            .write()
            .remove(id)
            .ok_or_else(|| EnrichmentError::invalid_config(format!("no prepared swap for {id}")))?;

        let new_generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        let new_key = generation_key(id, new_generation);
        {
            let mut slots = self.inner.slots.write();
            let mut active = self.inner.active.write();
            // The previous slot stays under its own generation key, only
            // its state changes; leases already holding that key can still
            // `release()` into it and drive it to `RETIRED`. Repointing
            // `active[id]` is the only thing that makes it stop being
            // selected for new acquires.
            if let Some(previous_key) = active.get(id) {
                if let Some(previous) = slots.get_mut(previous_key) {
                    previous.state = SlotState::Draining;
                }
            }
            slots.insert(
                new_key.clone(),
                Slot {
                    descriptor: candidate.descriptor,
                    instance: candidate.instance,
                    state: SlotState::Ready,
                    active_requests: 0,
                },
            );
            active.insert(id.to_string(), new_key);
        }
        // Existing leases against the previous instance remain valid
        // regardless of whether they drain within the grace period, per
        // §4.5 — this wait only gives well-behaved callers a chance to
        // observe RETIRED before returning; it never forces anything.
        tokio::time::sleep(grace_period.min(Duration::from_secs(5))).await;
        Ok(())
    }

    fn ready_ids(&self) -> Vec<String> {
        let slots = self.inner.slots.read();
        self.inner
            .active
            .read()
            .iter()
            .filter(|(_, key)| slots.get(*key).is_some_and(|slot| slot.state == SlotState::Ready))
            .map(|(id, _)| id.clone())
            .collect()
    }
}

impl<T: Send + Sync + 'static + ?Sized> InMemoryHotSwapManager<T> {
    /// Descriptors of every `READY` slot, for callers (ensemble selection,
    /// admin introspection) that need more than the bare id `ready_ids`
    /// returns.
    pub fn ready_descriptors(&self) -> Vec<ComponentDescriptor> {
        self.inner
            .slots
            .read()
            .values()
            .filter(|slot| slot.state == SlotState::Ready)
            .map(|slot| slot.descriptor.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn descriptor(id: &str) -> ComponentDescriptor {
        ComponentDescriptor {
            kind: ComponentKind::NerModel,
            id: id.to_string(),
            version: "1.0".into(),
            source_url: "https://models.example".into(),
            domains: HashSet::new(),
            declared_capabilities: HashSet::new(),
            checksum: None,
            trust_level: enrichment_domain::entities::TrustLevel::Trusted,
        }
    }

    fn active_key<T: Send + Sync + 'static + ?Sized>(manager: &InMemoryHotSwapManager<T>, id: &str) -> String {
        manager.inner.active.read().get(id).cloned().expect("id should be active")
    }

    #[tokio::test]
    async fn register_promotes_to_ready_and_acquire_succeeds() {
        let manager = InMemoryHotSwapManager::<u32>::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy));
        manager.register(descriptor("model-a"), Arc::new(42u32)).await.unwrap();
        let lease = manager.acquire("model-a").expect("slot should be ready");
        assert_eq!(*lease.instance(), 42);
    }

    #[tokio::test]
    async fn dropping_a_lease_releases_it() {
        let manager = InMemoryHotSwapManager::<u32>::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy));
        manager.register(descriptor("model-a"), Arc::new(1u32)).await.unwrap();
        let key = active_key(&manager, "model-a");
        {
            let _lease = manager.acquire("model-a").unwrap();
            assert_eq!(manager.inner.slots.read().get(&key).unwrap().active_requests, 1);
        }
        assert_eq!(manager.inner.slots.read().get(&key).unwrap().active_requests, 0);
    }

    #[tokio::test]
    async fn acquire_fails_for_unknown_or_not_ready_slot() {
        let manager = InMemoryHotSwapManager::<u32>::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy));
        assert!(manager.acquire("missing").is_none());
    }

    #[tokio::test]
    async fn swap_promotes_candidate_and_drains_previous() {
        let manager = InMemoryHotSwapManager::<u32>::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy));
        manager.register(descriptor("model-a"), Arc::new(1u32)).await.unwrap();
        let in_flight = manager.acquire("model-a").unwrap();

        let prepared = manager
            .prepare_swap("model-a", Arc::new(2u32), "2.0".into())
            .await
            .unwrap();
        assert!(prepared);

        manager.execute_swap("model-a", Duration::from_millis(1)).await.unwrap();

        // the old lease is still valid against the original instance
        assert_eq!(*in_flight.instance(), 1);

        // new acquires see the swapped-in instance
        let new_lease = manager.acquire("model-a").unwrap();
        assert_eq!(*new_lease.instance(), 2);

        drop(in_flight);
        // releasing the old lease must not have touched the new slot
        assert_eq!(*new_lease.instance(), 2);
    }

    #[tokio::test]
    async fn draining_slot_retires_only_after_its_own_lease_releases() {
        let manager = InMemoryHotSwapManager::<u32>::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy));
        manager.register(descriptor("model-a"), Arc::new(1u32)).await.unwrap();
        let old_key = active_key(&manager, "model-a");
        let in_flight = manager.acquire("model-a").unwrap();

        manager.prepare_swap("model-a", Arc::new(2u32), "2.0".into()).await.unwrap();
        manager.execute_swap("model-a", Duration::from_millis(1)).await.unwrap();

        // a fresh acquire increments the *new* slot, not the draining one
        let fresh = manager.acquire("model-a").unwrap();
        assert_eq!(manager.inner.slots.read().get(&old_key).unwrap().active_requests, 1);
        drop(fresh);

        assert_eq!(manager.inner.slots.read().get(&old_key).unwrap().state, SlotState::Draining);
        drop(in_flight);
        assert_eq!(manager.inner.slots.read().get(&old_key).unwrap().state, SlotState::Retired);
    }
}
