//! Ensemble selection (§4.2): scores eligible models and picks the top `k`.

use enrichment_domain::entities::{ComponentDescriptor, NerConfig};
use enrichment_domain::repositories::NerModel;
use std::collections::HashSet;
use std::sync::Arc;

pub struct ScoredModel {
    pub id: String,
    pub model: Arc<dyn NerModel>,
    pub score: f64,
}

fn latency_weight(observed_p95_ms: f64, max_latency_ms: f64) -> f64 {
    (1.0 - observed_p95_ms / max_latency_ms).max(0.0)
}

fn provider_weight(descriptor: &ComponentDescriptor) -> f64 {
    use enrichment_domain::entities::TrustLevel::*;
    match descriptor.trust_level {
        Trusted => 1.0,
        Verified => 0.75,
        Untrusted => 0.4,
        Unverified => 0.2,
        Blocked => 0.0,
    }
}

/// Fraction of `required_types` the model's declared capabilities cover.
/// An empty `required_types` set (domain has no declared requirement, or no
/// domain was given) counts as full coverage — there is nothing to miss.
fn coverage(declared: &[String], required_types: &HashSet<String>) -> f64 {
    if required_types.is_empty() {
        return 1.0;
    }
    let hit = required_types.iter().filter(|t| declared.iter().any(|d| d == *t)).count();
    hit as f64 / required_types.len() as f64
}

/// Scores and ranks every candidate, returning the top `k` (`min_models ≤ k
/// ≤ max_models`) that also pass the `min_f1`/`max_latency_ms` gates.
pub fn select_ensemble(
    candidates: Vec<(ComponentDescriptor, Arc<dyn NerModel>)>,
    domain: Option<&str>,
    required_types: &HashSet<String>,
    config: &NerConfig,
) -> Vec<ScoredModel> {
    let mut scored: Vec<ScoredModel> = candidates
        .into_iter()
        .filter(|(_, model)| model.f1_for_domain(domain) >= config.min_f1)
        .filter(|(_, model)| model.observed_p95_latency_ms() <= config.max_latency_ms as f64)
        .map(|(descriptor, model)| {
            let f1 = model.f1_for_domain(domain);
            let lw = latency_weight(model.observed_p95_latency_ms(), config.max_latency_ms as f64);
            let pw = provider_weight(&descriptor);
            let cov = coverage(model.declared_capabilities(), required_types);
            let score = 0.40 * f1 + 0.30 * lw + 0.20 * pw + 0.10 * cov;
            ScoredModel { id: descriptor.id, model, score }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(config.max_models.max(1));
    scored
}
