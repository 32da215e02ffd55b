use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The three kinds of swappable unit the hot-swap manager tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentKind {
    NerModel,
    KbProvider,
    PatternMatcher,
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ComponentKind::NerModel => "ner_model",
            ComponentKind::KbProvider => "kb_provider",
            ComponentKind::PatternMatcher => "pattern_matcher",
        };
        write!(f, "{label}")
    }
}

/// Registration-time trust classification assigned by the trust validator.
/// Ordered so that `>=` comparisons against a policy's minimum level are
/// meaningful: `BLOCKED < UNVERIFIED < UNTRUSTED < VERIFIED < TRUSTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrustLevel {
    Blocked,
    Unverified,
    Untrusted,
    Verified,
    Trusted,
}

/// Identifies one swappable unit: a NER model, a KB provider, or a pattern
/// matcher. Immutable once registered; a new version is a new descriptor
/// going through `PrepareSwap`/`ExecuteSwap`, not a mutation of this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub id: String,
    pub version: String,
    pub source_url: String,
    pub domains: HashSet<String>,
    pub declared_capabilities: HashSet<String>,
    pub checksum: Option<String>,
    pub trust_level: TrustLevel,
}

impl ComponentDescriptor {
    /// Whether this component declares eligibility for `domain`, or is
    /// domain-agnostic (empty `domains` means "eligible everywhere").
    pub fn eligible_for(&self, domain: Option<&str>) -> bool {
        if self.domains.is_empty() {
            return true;
        }
        match domain {
            Some(tag) => self.domains.contains(tag),
            None => false,
        }
    }
}
