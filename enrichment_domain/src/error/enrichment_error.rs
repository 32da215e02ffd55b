use thiserror::Error;

/// Structured failure kinds raised anywhere in the enrichment pipeline.
///
/// Each variant corresponds to one taxonomy entry the orchestrator reasons
/// about when deciding whether to fail a request or degrade gracefully. See
/// [`EnrichmentError::is_recoverable`] for the propagation split.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnrichmentError {
    /// Pipeline construction failed because configuration was malformed or
    /// internally inconsistent. Never raised once a request is in flight.
    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },

    /// The NER stage could not select any eligible model for the request's
    /// domain. Fatal for the request when the NER stage is enabled.
    #[error("no eligible NER models available for domain {domain:?}")]
    NoModelsAvailable { domain: Option<String> },

    /// A stage exhausted its sub-deadline before completing. The stage
    /// returns whatever partial result it had; this is recorded as a
    /// warning, never a fatal error.
    #[error("stage {stage} exceeded its {budget_ms}ms sub-deadline")]
    StageDeadlineExceeded { stage: String, budget_ms: u64 },

    /// A single component invocation (model or KB lookup) did not complete
    /// within its own timeout. Recovered by falling through to the next
    /// candidate.
    #[error("component {component_id} timed out after {elapsed_ms}ms")]
    ComponentTimeout { component_id: String, elapsed_ms: u64 },

    /// A component invocation failed with a transient, retryable error.
    /// Retried once with backoff within the stage budget; if the retry also
    /// fails it is treated as [`EnrichmentError::ComponentTimeout`].
    #[error("component {component_id} returned a transient error: {reason}")]
    ComponentError { component_id: String, reason: String },

    /// A `ComponentDescriptor` failed trust validation at registration time.
    /// The component is never instantiated and never appears in any slot.
    #[error("component {component_id} rejected by trust policy: {reason}")]
    TrustRejected { component_id: String, reason: String },

    /// A cache entry failed to decode into a whitelisted value type. The
    /// entry is evicted and the lookup falls through to the backend.
    #[error("cache entry for key {key} is corrupted and was evicted")]
    CacheCorrupted { key: String },

    /// The request's deadline or an explicit caller cancellation fired.
    /// The pipeline returns its current best-effort result.
    #[error("request cancelled")]
    CancelRequested,
}

impl EnrichmentError {
    /// Whether the orchestrator may degrade gracefully and keep serving the
    /// request, as opposed to raising this error to the caller.
    ///
    /// Only [`EnrichmentError::ConfigInvalid`] and
    /// [`EnrichmentError::NoModelsAvailable`] are non-recoverable; every
    /// other kind is captured as a warning on the `PipelineResult`.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            EnrichmentError::ConfigInvalid { .. } | EnrichmentError::NoModelsAvailable { .. }
        )
    }

    /// Stable category label for metrics and log fields. Does not change
    /// across error message wording revisions.
    pub fn category(&self) -> &'static str {
        match self {
            EnrichmentError::ConfigInvalid { .. } => "config_invalid",
            EnrichmentError::NoModelsAvailable { .. } => "no_models_available",
            EnrichmentError::StageDeadlineExceeded { .. } => "stage_deadline_exceeded",
            EnrichmentError::ComponentTimeout { .. } => "component_timeout",
            EnrichmentError::ComponentError { .. } => "component_error",
            EnrichmentError::TrustRejected { .. } => "trust_rejected",
            EnrichmentError::CacheCorrupted { .. } => "cache_corrupted",
            EnrichmentError::CancelRequested => "cancel_requested",
        }
    }

    /// Convenience constructor for [`EnrichmentError::ConfigInvalid`].
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        EnrichmentError::ConfigInvalid { reason: reason.into() }
    }

    /// Convenience constructor for [`EnrichmentError::ComponentError`].
    pub fn component_error(component_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EnrichmentError::ComponentError {
            component_id: component_id.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_config_invalid_and_no_models_are_unrecoverable() {
        let unrecoverable = [
            EnrichmentError::invalid_config("bad deadline"),
            EnrichmentError::NoModelsAvailable { domain: Some("medical".into()) },
        ];
        for err in &unrecoverable {
            assert!(!err.is_recoverable(), "{err:?} should be unrecoverable");
        }

        let recoverable = [
            EnrichmentError::StageDeadlineExceeded { stage: "ner".into(), budget_ms: 500 },
            EnrichmentError::ComponentTimeout { component_id: "umls".into(), elapsed_ms: 5000 },
            EnrichmentError::component_error("rxnorm", "503"),
            EnrichmentError::TrustRejected { component_id: "kb-x".into(), reason: "blocked".into() },
            EnrichmentError::CacheCorrupted { key: "umls:DRUG:aspirin".into() },
            EnrichmentError::CancelRequested,
        ];
        for err in &recoverable {
            assert!(err.is_recoverable(), "{err:?} should be recoverable");
        }
    }

    #[test]
    fn category_is_stable_per_variant() {
        assert_eq!(EnrichmentError::CancelRequested.category(), "cancel_requested");
        assert_eq!(
            EnrichmentError::invalid_config("x").category(),
            "config_invalid"
        );
    }
}
