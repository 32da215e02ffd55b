use crate::entities::{ComponentDescriptor, ComponentKind};
use crate::error::EnrichmentError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Narrow callback the hot-swap manager implements so a [`ComponentLease`]
/// can release itself on drop without the lease needing to know the
/// manager's full generic type. Kept separate from [`HotSwapManager`]
/// because a lease must be `dyn`-callable regardless of the instance type
/// `T` it carries.
pub trait ReleaseHandle: Send + Sync {
    fn release(&self, kind: ComponentKind, id: &str);
}

/// The reference a stage holds to a component while invoking it. Acquiring
/// one increments the slot's `active_requests`; dropping one (whether by
/// falling out of scope normally, by an early return, or by a panic
/// unwinding through it) releases it automatically, so a stage can never
/// leak a lease.
pub struct ComponentLease<T: ?Sized> {
    instance: Arc<T>,
    kind: ComponentKind,
    id: String,
    handle: Arc<dyn ReleaseHandle>,
}

impl<T: ?Sized> ComponentLease<T> {
    pub fn new(
        instance: Arc<T>,
        kind: ComponentKind,
        id: impl Into<String>,
        handle: Arc<dyn ReleaseHandle>,
    ) -> Self {
        ComponentLease { instance, kind, id: id.into(), handle }
    }

    pub fn instance(&self) -> &T {
        &self.instance
    }

    /// A cheap `Arc` clone of the leased instance, for callers (ensemble
    /// fan-out) that need to move it into a spawned task rather than borrow
    /// it for the lease's own lifetime.
    pub fn instance_arc(&self) -> Arc<T> {
        self.instance.clone()
    }

    pub fn component_id(&self) -> &str {
        &self.id
    }
}

impl<T: ?Sized> Drop for ComponentLease<T> {
    fn drop(&mut self) {
        self.handle.release(self.kind, &self.id);
    }
}

/// Manages the hot-swap lifecycle for one kind of component, parameterized
/// over the instance type `T` it serves (§4.5).
#[async_trait]
pub trait HotSwapManager<T: Send + Sync + 'static + ?Sized>: Send + Sync {
    /// `Register(descriptor, instance)`: creates a slot in `LOADING`, runs
    /// the health check, transitions to `READY` on success or `RETIRED` on
    /// failure. Returns `Err` only when the descriptor fails a precondition
    /// the manager itself enforces (trust rejection is the caller's
    /// responsibility before this is ever invoked — see `TrustValidator`).
    async fn register(
        &self,
        descriptor: ComponentDescriptor,
        instance: Arc<T>,
    ) -> Result<(), EnrichmentError>;

    /// `Acquire(kind, id) → leased_instance`. Returns `None` when no `READY`
    /// slot exists for `id` (never registered, still loading, or retired).
    fn acquire(&self, id: &str) -> Option<ComponentLease<T>>;

    /// `PrepareSwap(kind, id, new_instance, version)`.
    async fn prepare_swap(
        &self,
        id: &str,
        candidate: Arc<T>,
        version: String,
    ) -> Result<bool, EnrichmentError>;

    /// `ExecuteSwap(kind, id, grace_period)`.
    async fn execute_swap(&self, id: &str, grace_period: Duration) -> Result<(), EnrichmentError>;

    /// Current READY ids eligible for selection, used by stage-level
    /// selection criteria (§4.2) to enumerate candidates.
    fn ready_ids(&self) -> Vec<String>;
}
