use chrono::{DateTime, Utc};

/// Injectable time source, for determinism in tests and for A/B trial
/// duration bookkeeping (§6).
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
