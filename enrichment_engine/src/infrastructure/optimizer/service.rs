//! Ring-buffer telemetry, recommendations, and A/B trial bookkeeping
//! (§4.7), grounded structurally on the hot-swap manager's
//! lock-guarded-table shape in `infrastructure/hotswap.rs`.

use super::scoring::score_samples;
use super::stats::welch_t_test;
use async_trait::async_trait;
use enrichment_domain::entities::{ComponentKind, PerformanceSample};
use enrichment_domain::repositories::Clock;
use enrichment_domain::services::{Recommendation, SelfOptimizer, TrialOutcome};
use enrichment_domain::value_objects::RequestId;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const DEFAULT_WINDOW: usize = 1000;
const SIGNIFICANCE_ALPHA: f64 = 0.05;

type CohortKey = (ComponentKind, String, Option<String>);

struct Trial {
    kind: ComponentKind,
    control_id: String,
    treatment_id: String,
    traffic_split: f64,
    started_at: chrono::DateTime<chrono::Utc>,
    duration: Duration,
    domain: Option<String>,
}

pub struct InMemorySelfOptimizer {
    window: usize,
    min_samples: usize,
    performance_threshold: f64,
    strategy: enrichment_domain::entities::OptimizerStrategy,
    clock: Arc<dyn Clock>,
    buffers: RwLock<HashMap<CohortKey, VecDeque<PerformanceSample>>>,
    trials: RwLock<HashMap<String, Trial>>,
}

impl InMemorySelfOptimizer {
    pub fn new(
        strategy: enrichment_domain::entities::OptimizerStrategy,
        min_samples: usize,
        performance_threshold: f64,
        clock: Arc<dyn Clock>,
    ) -> Self {
        InMemorySelfOptimizer {
            window: DEFAULT_WINDOW,
            min_samples,
            performance_threshold,
            strategy,
            clock,
            buffers: RwLock::new(HashMap::new()),
            trials: RwLock::new(HashMap::new()),
        }
    }

    fn samples_for(&self, kind: ComponentKind, component_id: &str, domain: &Option<String>) -> Vec<PerformanceSample> {
        self.buffers
            .read()
            .get(&(kind, component_id.to_string(), domain.clone()))
            .map(|buf| buf.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SelfOptimizer for InMemorySelfOptimizer {
    fn record_sample(&self, sample: PerformanceSample) {
        let key = sample.cohort_key();
        let mut buffers = self.buffers.write();
        let buffer = buffers.entry(key).or_insert_with(|| VecDeque::with_capacity(self.window));
        if buffer.len() == self.window {
            buffer.pop_front();
        }
        buffer.push_back(sample);
    }

    fn recommendations(&self) -> Vec<Recommendation> {
        let buffers = self.buffers.read();

        // Group cohorts by (kind, domain) so components competing for the
        // same slot are compared against each other.
        let mut by_cohort: HashMap<(ComponentKind, Option<String>), Vec<&String>> = HashMap::new();
        for (kind, component_id, domain) in buffers.keys() {
            by_cohort.entry((*kind, domain.clone())).or_default().push(component_id);
        }

        let mut recommendations = Vec::new();
        for ((kind, domain), component_ids) in by_cohort {
            let mut eligible: Vec<(&String, Vec<PerformanceSample>)> = component_ids
                .into_iter()
                .filter_map(|id| {
                    let samples: Vec<PerformanceSample> =
                        buffers.get(&(kind, id.clone(), domain.clone()))?.iter().cloned().collect();
                    if samples.len() >= self.min_samples {
                        Some((id, samples))
                    } else {
                        None
                    }
                })
                .collect();

            if eligible.len() < 2 {
                continue;
            }

            // The component with the most samples stands in for "current"
            // in the absence of an explicit active-component registry at
            // this layer; the orchestrator, which does track the active
            // hot-swap slot, is expected to pass that id through when it
            // wires this trait up in a future host (see DESIGN.md).
            eligible.sort_by_key(|(_, samples)| std::cmp::Reverse(samples.len()));
            let (current_id, current_samples) = eligible.remove(0);
            let current_scores = score_samples(&current_samples, self.strategy);
            let current_mean = current_scores.iter().sum::<f64>() / current_scores.len() as f64;

            for (candidate_id, candidate_samples) in &eligible {
                let candidate_scores = score_samples(candidate_samples, self.strategy);
                let candidate_mean = candidate_scores.iter().sum::<f64>() / candidate_scores.len() as f64;

                if candidate_mean - current_mean < self.performance_threshold {
                    continue;
                }

                let Some(result) = welch_t_test(&current_scores, &candidate_scores) else {
                    continue;
                };
                if result.p_value >= SIGNIFICANCE_ALPHA {
                    continue;
                }

                recommendations.push(Recommendation {
                    kind,
                    domain: domain.clone(),
                    current_id: current_id.clone(),
                    candidate_id: (*candidate_id).clone(),
                    current_score: current_mean,
                    candidate_score: candidate_mean,
                    p_value: result.p_value,
                });
            }
        }

        recommendations
    }

    async fn start_trial(
        &self,
        experiment_id: String,
        kind: ComponentKind,
        control_id: String,
        treatment_id: String,
        traffic_split: f64,
        duration: Duration,
    ) {
        let trial = Trial {
            kind,
            control_id,
            treatment_id,
            traffic_split: traffic_split.clamp(0.0, 1.0),
            started_at: self.clock.now(),
            duration,
            domain: None,
        };
        info!(experiment_id = %experiment_id, "A/B trial started");
        self.trials.write().insert(experiment_id, trial);
    }

    fn trial_routes_to_treatment(&self, experiment_id: &str, request_id: RequestId) -> Option<bool> {
        let trials = self.trials.read();
        let trial = trials.get(experiment_id)?;
        Some(request_id.bucket_fraction() < trial.traffic_split)
    }

    fn finalize_trial(&self, experiment_id: &str) -> Option<TrialOutcome> {
        let trial = {
            let trials = self.trials.read();
            let trial = trials.get(experiment_id)?;
            if self.clock.now() < trial.started_at + chrono::Duration::from_std(trial.duration).ok()? {
                return None;
            }
            Trial {
                kind: trial.kind,
                control_id: trial.control_id.clone(),
                treatment_id: trial.treatment_id.clone(),
                traffic_split: trial.traffic_split,
                started_at: trial.started_at,
                duration: trial.duration,
                domain: trial.domain.clone(),
            }
        };

        let control_samples = self.samples_for(trial.kind, &trial.control_id, &trial.domain);
        let treatment_samples = self.samples_for(trial.kind, &trial.treatment_id, &trial.domain);

        let control_scores = score_samples(&control_samples, self.strategy);
        let treatment_scores = score_samples(&treatment_samples, self.strategy);

        let control_mean = control_scores.iter().sum::<f64>() / control_scores.len().max(1) as f64;
        let treatment_mean = treatment_scores.iter().sum::<f64>() / treatment_scores.len().max(1) as f64;

        let result = welch_t_test(&control_scores, &treatment_scores);
        let (p_value, significant) = match result {
            Some(r) => (r.p_value, r.p_value < SIGNIFICANCE_ALPHA),
            None => (1.0, false),
        };

        let winner_id = if significant && treatment_mean > control_mean {
            trial.treatment_id.clone()
        } else {
            trial.control_id.clone()
        };

        self.trials.write().remove(experiment_id);

        Some(TrialOutcome {
            experiment_id: experiment_id.to_string(),
            winner_id,
            control_score: control_mean,
            treatment_score: treatment_mean,
            p_value,
            significant,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FixedClock;
    use chrono::Utc;

    fn sample(id: &str, latency: f64, accuracy: f64) -> PerformanceSample {
        PerformanceSample {
            component_id: id.into(),
            kind: ComponentKind::NerModel,
            domain: None,
            latency_ms: latency,
            throughput_eps: 10.0,
            accuracy_proxy: accuracy,
            error: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn recommends_a_clearly_better_candidate() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let optimizer = InMemorySelfOptimizer::new(
            enrichment_domain::entities::OptimizerStrategy::Balanced,
            5,
            0.05,
            clock,
        );
        for _ in 0..20 {
            optimizer.record_sample(sample("weak", 900.0, 0.5));
            optimizer.record_sample(sample("strong", 100.0, 0.95));
        }
        let recommendations = optimizer.recommendations();
        assert!(recommendations.iter().any(|r| r.candidate_id == "strong" && r.current_id == "weak"));
    }

    #[test]
    fn below_min_samples_yields_no_recommendation() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let optimizer =
            InMemorySelfOptimizer::new(enrichment_domain::entities::OptimizerStrategy::Balanced, 10, 0.05, clock);
        optimizer.record_sample(sample("weak", 900.0, 0.5));
        optimizer.record_sample(sample("strong", 100.0, 0.95));
        assert!(optimizer.recommendations().is_empty());
    }

    /// A request id whose `bucket_fraction()` lands at roughly `byte / 255`,
    /// since `bucket_fraction` reads the id's leading bytes as a big-endian
    /// integer over `u64::MAX`.
    fn request_id_with_fraction_near(byte: u8) -> RequestId {
        RequestId::from_ulid(ulid::Ulid::from_bytes([byte; 16]))
    }

    #[tokio::test]
    async fn trial_bucketing_is_deterministic_per_request_id() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let optimizer =
            InMemorySelfOptimizer::new(enrichment_domain::entities::OptimizerStrategy::Balanced, 10, 0.05, clock);
        optimizer
            .start_trial(
                "exp-1".into(),
                ComponentKind::NerModel,
                "control".into(),
                "treatment".into(),
                0.5,
                Duration::from_secs(3600),
            )
            .await;
        let low = request_id_with_fraction_near(0x33);
        let high = request_id_with_fraction_near(0xcc);
        assert_eq!(optimizer.trial_routes_to_treatment("exp-1", low), Some(true));
        assert_eq!(optimizer.trial_routes_to_treatment("exp-1", high), Some(false));
        // the same request id always buckets the same way
        assert_eq!(
            optimizer.trial_routes_to_treatment("exp-1", low),
            optimizer.trial_routes_to_treatment("exp-1", low)
        );
        assert_eq!(optimizer.trial_routes_to_treatment("unknown", low), None);
    }

    #[tokio::test]
    async fn finalize_before_duration_expiry_returns_none() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let optimizer = InMemorySelfOptimizer::new(
            enrichment_domain::entities::OptimizerStrategy::Balanced,
            10,
            0.05,
            clock,
        );
        optimizer
            .start_trial(
                "exp-1".into(),
                ComponentKind::NerModel,
                "control".into(),
                "treatment".into(),
                0.5,
                Duration::from_secs(3600),
            )
            .await;
        assert!(optimizer.finalize_trial("exp-1").is_none());
    }
}
