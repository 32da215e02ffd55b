use crate::entities::{ComponentDescriptor, TrustLevel, TrustPolicy};

/// Decides at registration whether a `ComponentDescriptor` is allowed
/// (§4.6). Pure: no side effects besides returning a decision, and it never
/// loads the component it evaluates.
pub trait TrustValidator: Send + Sync {
    /// Assigns a `trust_level` to `descriptor` under `policy`, per the
    /// algorithm in §4.6.
    fn classify(&self, descriptor: &ComponentDescriptor, policy: &TrustPolicy) -> TrustLevel;

    /// `true` iff `classify(descriptor, policy) >= policy.min_trust_level[kind]`.
    fn is_allowed(&self, descriptor: &ComponentDescriptor, policy: &TrustPolicy) -> bool {
        let level = self.classify(descriptor, policy);
        level >= policy.min_trust_level(descriptor.kind)
    }
}
