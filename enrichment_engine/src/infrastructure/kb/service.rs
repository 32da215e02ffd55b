//! KB enrichment stage (§4.3): fallback-chain lookup per entity, gated by a
//! stage-wide semaphore bounding in-flight KB calls, with cache-through on
//! every hit and per-entity (never stage-fatal) failure handling.

use super::cache_codec::{from_cache_value, to_cache_value};
use crate::infrastructure::cache::MultiTierCache;
use async_trait::async_trait;
use enrichment_domain::entities::{EntityRecord, PipelineConfig};
use enrichment_domain::repositories::KbProvider;
use enrichment_domain::services::EnrichmentStageService;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::warn;

pub struct ChainEnrichmentStage {
    providers: HashMap<String, Arc<dyn KbProvider>>,
    cache: Arc<MultiTierCache>,
}

impl ChainEnrichmentStage {
    pub fn new(providers: HashMap<String, Arc<dyn KbProvider>>, cache: Arc<MultiTierCache>) -> Self {
        ChainEnrichmentStage { providers, cache }
    }

    async fn enrich_one(
        &self,
        mut entity: EntityRecord,
        chain_name: &str,
        chain: &[String],
        timeout: Duration,
    ) -> (EntityRecord, Option<String>) {
        let cache_key = format!("{chain_name}:{}:{}", entity.entity_type, entity.text.to_lowercase());

        if let Some((value, _tier)) = self.cache.get(&cache_key).await {
            if let Some(result) = from_cache_value(&value) {
                entity.apply_enrichment(
                    chain.first().cloned().unwrap_or_default(),
                    Some(result.entity_id),
                    Some(result.canonical_name),
                    result.definition,
                    result.semantic_types,
                    result.relationships,
                    entity.confidence,
                );
                return (entity, None);
            }
        }

        for kb_id in chain {
            let Some(provider) = self.providers.get(kb_id) else {
                continue;
            };
            match tokio::time::timeout(timeout, provider.lookup(&entity.text, &entity.entity_type)).await {
                Ok(Ok(Some(result))) => {
                    self.cache.put(&cache_key, to_cache_value(&result), Duration::from_secs(3600)).await;
                    entity.apply_enrichment(
                        kb_id.clone(),
                        Some(result.entity_id),
                        Some(result.canonical_name),
                        result.definition,
                        result.semantic_types,
                        result.relationships,
                        entity.confidence,
                    );
                    return (entity, None);
                }
                Ok(Ok(None)) => continue,
                Ok(Err(_)) | Err(_) => continue,
            }
        }

        let warning = format!(
            "no KB in chain '{chain_name}' resolved entity '{}' ({})",
            entity.text, entity.entity_type
        );
        (entity, Some(warning))
    }
}

#[async_trait]
impl EnrichmentStageService for ChainEnrichmentStage {
    async fn enrich(
        &self,
        entities: Vec<EntityRecord>,
        domain: Option<&str>,
        config: &PipelineConfig,
    ) -> (Vec<EntityRecord>, Vec<String>) {
        let chain_name = domain.unwrap_or("");
        let chain = config.kb.chain_by_domain.get(chain_name).cloned().unwrap_or_default();
        if chain.is_empty() {
            return (entities, Vec::new());
        }

        let timeout = Duration::from_millis(config.kb.per_lookup_timeout_ms);
        let semaphore = Arc::new(Semaphore::new(config.kb.max_concurrent.get()));
        let min_confidence = config.kb.min_confidence_for_enrichment;

        // A `JoinSet`, not detached `tokio::spawn`s: dropping it (as happens
        // when the orchestrator's stage-deadline `timeout` fires around this
        // whole future) aborts every still-running task, including one
        // blocked on the semaphore or mid-`lookup`. Detached tasks would
        // keep running past the stage budget.
        let mut tasks: JoinSet<(usize, EntityRecord, Option<String>)> = JoinSet::new();
        for (index, entity) in entities.into_iter().enumerate() {
            if !config.kb.enrich_all && !entity.confidence.meets(min_confidence) {
                tasks.spawn(async move { (index, entity, None) });
                continue;
            }

            let semaphore = semaphore.clone();
            let chain = chain.clone();
            let chain_name = chain_name.to_string();
            let this_providers = self.providers.clone();
            let cache = self.cache.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                let stage = ChainEnrichmentStage { providers: this_providers, cache };
                let (entity, warning) = stage.enrich_one(entity, &chain_name, &chain, timeout).await;
                (index, entity, warning)
            });
        }

        let mut slots: Vec<Option<EntityRecord>> = Vec::new();
        let mut warnings = Vec::new();
        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(triple) => results.push(triple),
                Err(join_err) => warn!(error = %join_err, "kb enrichment task panicked"),
            }
        }
        results.sort_by_key(|(index, _, _)| *index);
        slots.resize_with(results.len(), || None);
        for (index, entity, warning) in results {
            if let Some(warning) = warning {
                warnings.push(warning);
            }
            if index < slots.len() {
                slots[index] = Some(entity);
            }
        }

        (slots.into_iter().flatten().collect(), warnings)
    }
}
