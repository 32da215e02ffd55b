//! Strategy-weighted scoring (§4.7). Every metric is normalized across the
//! cohort of samples passed in, so scores from different scoring calls are
//! not comparable — only scores computed together, over the same cohort,
//! are.

use enrichment_domain::entities::{OptimizerStrategy, PerformanceSample};

fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if !(max > min) {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| (v - min) / (max - min)).collect()
}

/// Per-sample scalar scores for `samples`, under `strategy`, with latency
/// and throughput each min-max normalized across this exact slice.
///
/// `COST` has no distinct cost metric in `PerformanceSample`; it is
/// approximated using the same normalized latency as a cost proxy, since
/// the dominant cost driver in this pipeline (compute time) tracks latency
/// directly. This is a narrower reading of §4.7 than "policy-provided cost
/// weight", recorded as an open-question resolution.
pub fn score_samples(samples: &[PerformanceSample], strategy: OptimizerStrategy) -> Vec<f64> {
    if samples.is_empty() {
        return Vec::new();
    }

    let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
    let throughputs: Vec<f64> = samples.iter().map(|s| s.throughput_eps).collect();
    let normalized_latency = min_max_normalize(&latencies);
    let normalized_throughput = min_max_normalize(&throughputs);

    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| match strategy {
            OptimizerStrategy::Balanced => 0.60 * sample.accuracy_proxy - 0.40 * normalized_latency[i],
            OptimizerStrategy::Latency => 1.0 - normalized_latency[i],
            OptimizerStrategy::Accuracy => sample.accuracy_proxy,
            OptimizerStrategy::Throughput => normalized_throughput[i],
            OptimizerStrategy::Cost => 1.0 - normalized_latency[i],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use enrichment_domain::entities::ComponentKind;

    fn sample(latency: f64, accuracy: f64, throughput: f64) -> PerformanceSample {
        PerformanceSample {
            component_id: "model-a".into(),
            kind: ComponentKind::NerModel,
            domain: None,
            latency_ms: latency,
            throughput_eps: throughput,
            accuracy_proxy: accuracy,
            error: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn balanced_rewards_accuracy_and_penalizes_latency() {
        let samples = vec![sample(100.0, 0.9, 10.0), sample(900.0, 0.5, 10.0)];
        let scores = score_samples(&samples, OptimizerStrategy::Balanced);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn latency_strategy_prefers_the_faster_sample() {
        let samples = vec![sample(100.0, 0.1, 10.0), sample(900.0, 0.9, 10.0)];
        let scores = score_samples(&samples, OptimizerStrategy::Latency);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn no_variation_normalizes_to_zero_not_nan() {
        let samples = vec![sample(500.0, 0.7, 10.0), sample(500.0, 0.7, 10.0)];
        let scores = score_samples(&samples, OptimizerStrategy::Latency);
        assert!(scores.iter().all(|s| s.is_finite()));
    }
}
