use crate::error::EnrichmentError;
use async_trait::async_trait;

/// A single raw hit from a model, before fusion. Offsets are into the text
/// passed to `extract`.
#[derive(Debug, Clone, PartialEq)]
pub struct NerHit {
    pub text: String,
    pub entity_type: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}

/// Port for a named-entity recognition model. Implementations wrap whatever
/// inference runtime backs the model; the engine only ever calls `extract`
/// through a hot-swap lease.
#[async_trait]
pub trait NerModel: Send + Sync {
    /// Extracts entities from `text`. May return zero hits; a failure
    /// propagates to the NER stage as a model-level error, not a panic.
    async fn extract(&self, text: &str) -> Result<Vec<NerHit>, EnrichmentError>;

    /// Declared entity types this model claims to emit, used for the
    /// `coverage(domain)` term of the selection score (§4.2).
    fn declared_capabilities(&self) -> &[String];

    /// Observed F1 for `domain`, used by the selection score. Implementations
    /// typically report a static, benchmark-derived value.
    fn f1_for_domain(&self, domain: Option<&str>) -> f64;

    /// Observed p95 latency in milliseconds, used for `latency_weight`.
    fn observed_p95_latency_ms(&self) -> f64;
}
