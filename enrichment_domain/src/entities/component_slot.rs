use super::ComponentDescriptor;

/// Hot-swap lifecycle state for one `(kind, id)` slot.
///
/// ```text
/// LOADING  --(health_check_ok)--> READY
/// READY    --(prepare_swap)-----> DRAINING
/// DRAINING --(active_requests==0)-> RETIRED
/// LOADING  --(health_check_fail)-> RETIRED (rollback)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Loading,
    Ready,
    Draining,
    Retired,
}

/// The pure data shape of a hot-swap slot: a descriptor, its instance, a
/// lifecycle state, and an active-lease count.
///
/// This type describes the *state machine*, not its concurrent enforcement —
/// the engine's hot-swap manager wraps the transitions below in atomics and
/// a lock-guarded table so that `Acquire`/`Release` are safe across tasks.
/// Kept here as a plain value so the transition rules themselves can be unit
/// tested without any concurrency machinery.
#[derive(Debug, Clone)]
pub struct ComponentSlot<T> {
    pub descriptor: ComponentDescriptor,
    pub instance: T,
    pub state: SlotState,
    pub active_requests: u32,
}

impl<T> ComponentSlot<T> {
    pub fn loading(descriptor: ComponentDescriptor, instance: T) -> Self {
        ComponentSlot {
            descriptor,
            instance,
            state: SlotState::Loading,
            active_requests: 0,
        }
    }

    /// `LOADING --(health_check_ok)--> READY`. No-op (returns `false`) from
    /// any other state.
    pub fn mark_ready(&mut self) -> bool {
        if self.state == SlotState::Loading {
            self.state = SlotState::Ready;
            true
        } else {
            false
        }
    }

    /// `LOADING --(health_check_fail)--> RETIRED`.
    pub fn mark_failed(&mut self) -> bool {
        if self.state == SlotState::Loading {
            self.state = SlotState::Retired;
            true
        } else {
            false
        }
    }

    /// `READY --(prepare_swap)--> DRAINING`.
    pub fn begin_draining(&mut self) -> bool {
        if self.state == SlotState::Ready {
            self.state = SlotState::Draining;
            true
        } else {
            false
        }
    }

    /// A lease may only be acquired against a `READY` slot.
    pub fn can_acquire(&self) -> bool {
        self.state == SlotState::Ready
    }

    pub fn acquire(&mut self) {
        self.active_requests += 1;
    }

    /// Releases one lease; if this drains the last outstanding lease of a
    /// `DRAINING` slot, transitions it to `RETIRED` and reports that.
    pub fn release(&mut self) -> bool {
        self.active_requests = self.active_requests.saturating_sub(1);
        if self.state == SlotState::Draining && self.active_requests == 0 {
            self.state = SlotState::Retired;
            true
        } else {
            false
        }
    }
}
