use crate::entities::{ComponentKind, PerformanceSample};
use crate::value_objects::RequestId;
use async_trait::async_trait;
use std::time::Duration;

/// An advisory recommendation to swap the current component for a
/// higher-scoring candidate. The optimizer never performs the swap itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub kind: ComponentKind,
    pub domain: Option<String>,
    pub current_id: String,
    pub candidate_id: String,
    pub current_score: f64,
    pub candidate_score: f64,
    pub p_value: f64,
}

/// The result of an A/B trial once its duration has expired.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialOutcome {
    pub experiment_id: String,
    pub winner_id: String,
    pub control_score: f64,
    pub treatment_score: f64,
    pub p_value: f64,
    pub significant: bool,
}

/// Observes component performance and recommends swaps; optionally runs A/B
/// trials (§4.7). Telemetry ingest is fire-and-forget from a stage's
/// perspective — `record_sample` never blocks the request path.
#[async_trait]
pub trait SelfOptimizer: Send + Sync {
    fn record_sample(&self, sample: PerformanceSample);

    /// Computes recommendations for every `(kind, domain)` cohort with
    /// enough samples to be significant, per the current component in each
    /// cohort.
    fn recommendations(&self) -> Vec<Recommendation>;

    async fn start_trial(
        &self,
        experiment_id: String,
        kind: ComponentKind,
        control_id: String,
        treatment_id: String,
        traffic_split: f64,
        duration: Duration,
    );

    /// Deterministic bucketing: hashes `request_id` into a `[0,1)` fraction
    /// and decides whether the request routes to the treatment arm of
    /// `experiment_id`. The same request id always lands in the same arm
    /// for the trial's lifetime. Returns `None` if no such trial is active.
    fn trial_routes_to_treatment(&self, experiment_id: &str, request_id: RequestId) -> Option<bool>;

    /// Declares a winner for a trial whose duration has expired. Returns
    /// `None` if the trial is unknown or still running.
    fn finalize_trial(&self, experiment_id: &str) -> Option<TrialOutcome>;
}
