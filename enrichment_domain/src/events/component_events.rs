use crate::entities::{ComponentKind, TrustLevel};
use chrono::{DateTime, Utc};

/// Emitted by the hot-swap manager and trust validator around a component's
/// lifecycle. Purely informational — nothing in the pipeline subscribes to
/// these to make a decision; they exist for the host's observability layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentLifecycleEvent {
    Registered {
        kind: ComponentKind,
        id: String,
        trust_level: TrustLevel,
        at: DateTime<Utc>,
    },
    Rejected {
        kind: ComponentKind,
        id: String,
        reason: String,
        at: DateTime<Utc>,
    },
    PromotedToReady {
        kind: ComponentKind,
        id: String,
        at: DateTime<Utc>,
    },
    SwapExecuted {
        kind: ComponentKind,
        previous_id: String,
        new_id: String,
        at: DateTime<Utc>,
    },
    Retired {
        kind: ComponentKind,
        id: String,
        at: DateTime<Utc>,
    },
}
