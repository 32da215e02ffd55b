//! NER ensemble stage service (§4.2): selects an ensemble from the hot-swap
//! registry, fans the chosen models out concurrently with per-model
//! timeouts under a shared stage deadline, and fuses their hits by vote.
//!
//! The fan-out genuinely runs every model concurrently via
//! `tokio::task::JoinSet`, rather than awaiting each call in turn — a stage
//! with an ensemble of three slow models must not take three times as long
//! as the slowest one.

use super::fusion::fuse;
use super::selection::select_ensemble;
use crate::infrastructure::hotswap::InMemoryHotSwapManager;
use async_trait::async_trait;
use enrichment_domain::entities::{EntityRecord, PipelineConfig};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::{NerHit, NerModel};
use enrichment_domain::services::{ComponentLease, HotSwapManager, NerStageService};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::warn;

pub struct EnsembleNerStage {
    manager: Arc<InMemoryHotSwapManager<dyn NerModel>>,
}

impl EnsembleNerStage {
    pub fn new(manager: Arc<InMemoryHotSwapManager<dyn NerModel>>) -> Self {
        EnsembleNerStage { manager }
    }
}

#[async_trait]
impl NerStageService for EnsembleNerStage {
    async fn extract(
        &self,
        text: &str,
        domain: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<EntityRecord>, EnrichmentError> {
        let descriptors = self.manager.ready_descriptors();
        let mut candidates = Vec::new();
        let mut leases: HashMap<String, ComponentLease<dyn NerModel>> = HashMap::new();
        for descriptor in &descriptors {
            if !descriptor.eligible_for(domain) {
                continue;
            }
            if let Some(lease) = self.manager.acquire(&descriptor.id) {
                candidates.push((descriptor.clone(), lease.instance_arc()));
                leases.insert(descriptor.id.clone(), lease);
            }
        }

        if candidates.is_empty() {
            return Err(EnrichmentError::NoModelsAvailable { domain: domain.map(str::to_string) });
        }

        let required_types = HashSet::new();
        let selected = select_ensemble(candidates, domain, &required_types, &config.ner);
        if selected.is_empty() {
            return Err(EnrichmentError::NoModelsAvailable { domain: domain.map(str::to_string) });
        }

        // Leases on models that didn't make the cut release immediately;
        // leases on the ones that did are moved into their task below so
        // `active_requests` stays incremented for as long as `extract` is
        // actually running, matching the draining slot's live-lease count.
        let selected_ids: HashSet<&str> = selected.iter().map(|s| s.id.as_str()).collect();
        leases.retain(|id, _| selected_ids.contains(id.as_str()));

        let ensemble_size = selected.len();
        let stage_budget = config.stage_budget(enrichment_domain::entities::StageKind::Ner);
        let per_model_timeout = stage_budget / 2;

        let mut joinset: JoinSet<(String, Option<Vec<NerHit>>)> = JoinSet::new();
        for scored in selected {
            let text = text.to_string();
            let id = scored.id.clone();
            let model = scored.model;
            let lease = leases.remove(&id);
            joinset.spawn(async move {
                let _lease = lease;
                match tokio::time::timeout(per_model_timeout, model.extract(&text)).await {
                    Ok(Ok(hits)) => (id, Some(hits)),
                    Ok(Err(err)) => {
                        warn!(component_id = %id, error = %err, "ner model returned an error");
                        (id, None)
                    }
                    Err(_) => {
                        warn!(component_id = %id, timeout_ms = per_model_timeout.as_millis(), "ner model timed out");
                        (id, None)
                    }
                }
            });
        }

        let mut per_model_hits = Vec::with_capacity(ensemble_size);
        while let Some(joined) = joinset.join_next().await {
            match joined {
                Ok((id, Some(hits))) => per_model_hits.push((id, hits)),
                Ok((_, None)) => {}
                Err(join_err) => warn!(error = %join_err, "ner model task panicked"),
            }
        }

        if per_model_hits.is_empty() {
            return Ok(Vec::new());
        }

        let contributing = per_model_hits.len();
        let entities = fuse(
            per_model_hits,
            contributing,
            1,
            config.ner.min_models_for_quorum,
            config.ner.min_confidence,
        );

        Ok(entities)
    }
}

/// A no-op timeout helper kept separate from `tokio::time::timeout` use
/// above only to give the per-model default ("half the stage budget")
/// somewhere explicit to live if a future config field overrides it.
#[allow(dead_code)]
fn default_per_model_timeout(stage_budget: Duration) -> Duration {
    stage_budget / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeNerModel;
    use enrichment_domain::entities::{ComponentDescriptor, ComponentKind, PipelineConfig, TrustLevel};

    #[tokio::test]
    async fn no_eligible_models_fails_with_no_models_available() {
        let manager = Arc::new(InMemoryHotSwapManager::<dyn NerModel>::new(
            ComponentKind::NerModel,
            Arc::new(crate::infrastructure::hotswap::AlwaysHealthy),
        ));
        let stage = EnsembleNerStage::new(manager);
        let config = PipelineConfig::default();
        let result = stage.extract("some text", None, &config).await;
        assert!(matches!(result, Err(EnrichmentError::NoModelsAvailable { .. })));
    }

    #[tokio::test]
    async fn two_agreeing_models_fuse_into_one_boosted_entity() {
        let manager = Arc::new(InMemoryHotSwapManager::<dyn NerModel>::new(
            ComponentKind::NerModel,
            Arc::new(crate::infrastructure::hotswap::AlwaysHealthy),
        ));

        for id in ["model-a", "model-b"] {
            let descriptor = ComponentDescriptor {
                kind: ComponentKind::NerModel,
                id: id.to_string(),
                version: "1.0".into(),
                source_url: "https://models.example".into(),
                domains: Default::default(),
                declared_capabilities: Default::default(),
                checksum: None,
                trust_level: TrustLevel::Trusted,
            };
            let model: Arc<dyn NerModel> = Arc::new(FakeNerModel::new(
                vec![NerHit { text: "Aspirin".into(), entity_type: "DRUG".into(), start: 0, end: 7, confidence: 0.8 }],
                0.9,
                50.0,
            ));
            manager.register(descriptor, model).await.unwrap();
        }

        let stage = EnsembleNerStage::new(manager);
        let config = PipelineConfig::default();
        let entities = stage.extract("Aspirin 81mg", None, &config).await.unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "DRUG");
        assert_eq!(entities[0].source_ids.len(), 2);
    }
}
