//! The pipeline orchestrator: the sole entry point a host calls to run a
//! request through NER, enrichment, patterns, and post-processing. Grounded
//! on the teacher's `ProcessFileUseCase` shape (a struct holding the
//! collaborators it needs as `Arc`s, one `execute`-style async method that
//! walks a fixed sequence of steps, heavily commented at the step
//! boundaries rather than inside them).

use async_trait::async_trait;
use enrichment_domain::entities::{EntityRecord, PipelineConfig, SourceStage, StageKind};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::ConfigLoader;
use enrichment_domain::services::{
    EnrichmentStageService, NerStageService, OrchestratorService, PatternStageService,
    PipelineObserver,
};
use enrichment_domain::PipelineResult;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::infrastructure::MetricsService;

/// Type aliases collapsing duplicate-type tuples used by the type-alias
/// dedup rule in post-processing. An entity type on the left is considered
/// the same kind of thing as the type it maps to on the right; the table is
/// intentionally small and symmetric lookups are resolved by canonicalizing
/// both sides before comparing.
fn canonical_type(entity_type: &str) -> &str {
    match entity_type {
        "MEDICATION" => "DRUG",
        "DIAGNOSIS" => "ICD_CODE",
        "PROCEDURE" => "CPT_CODE",
        "STATUTE" => "USC_CITATION",
        other => other,
    }
}

/// Default no-op observer used when a caller doesn't supply one.
struct SilentObserver;

#[async_trait]
impl PipelineObserver for SilentObserver {
    async fn on_stage_started(&self, _stage: StageKind) {}
    async fn on_stage_completed(&self, _stage: StageKind, _elapsed: Duration, _entity_count: usize) {}
    async fn on_result(&self, _result: &PipelineResult) {}
}

/// Runs the four-stage pipeline for a single request, enforcing the total
/// deadline and per-stage sub-deadlines, and producing a `PipelineResult`
/// that is always returned (never a bare panic or silent drop) even when
/// individual stages fail or time out.
pub struct PipelineOrchestrator {
    config_loader: Arc<dyn ConfigLoader>,
    ner: Arc<dyn NerStageService>,
    enrichment: Arc<dyn EnrichmentStageService>,
    patterns: Arc<dyn PatternStageService>,
    observer: Arc<dyn PipelineObserver>,
    metrics: Option<Arc<MetricsService>>,
}

impl PipelineOrchestrator {
    pub fn new(
        config_loader: Arc<dyn ConfigLoader>,
        ner: Arc<dyn NerStageService>,
        enrichment: Arc<dyn EnrichmentStageService>,
        patterns: Arc<dyn PatternStageService>,
    ) -> Self {
        PipelineOrchestrator {
            config_loader,
            ner,
            enrichment,
            patterns,
            observer: Arc::new(SilentObserver),
            metrics: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsService>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// `true` once `deadline_at` has passed; used at every stage boundary to
    /// decide whether the remaining stages should be skipped rather than
    /// merely whether the *current* stage's sub-deadline expired.
    fn deadline_expired(deadline_at: Instant) -> bool {
        Instant::now() >= deadline_at
    }

    async fn run_ner_stage(
        &self,
        text: &str,
        domain: Option<&str>,
        config: &PipelineConfig,
        result: &mut PipelineResult,
    ) -> Vec<EntityRecord> {
        if !config.is_stage_enabled(StageKind::Ner) {
            return Vec::new();
        }
        self.observer.on_stage_started(StageKind::Ner).await;
        let budget = config.stage_budget(StageKind::Ner);
        let started = Instant::now();

        let outcome = tokio::time::timeout(budget, self.ner.extract(text, domain, config)).await;
        let entities = match outcome {
            Ok(Ok(entities)) => entities,
            Ok(Err(err)) if !err.is_recoverable() => {
                // NoModelsAvailable (or, in principle, ConfigInvalid) is the
                // one NER failure the spec treats as fatal; propagate it by
                // recording it and returning no entities, letting the caller
                // decide via `result.errors` whether later stages are worth
                // running. The NER contract reserves fatal-for-the-request
                // behavior to the call site in `process`, not here.
                result.push_error(err.to_string());
                Vec::new()
            }
            Ok(Err(err)) => {
                warn!(stage = "ner", error = %err, "ner stage returned a recoverable error");
                result.push_warning(err.to_string());
                Vec::new()
            }
            Err(_) => {
                let elapsed = Instant::now().duration_since(started);
                warn!(stage = "ner", budget_ms = budget.as_millis(), "ner stage exceeded its sub-deadline");
                result.push_warning(
                    EnrichmentError::StageDeadlineExceeded {
                        stage: "ner".into(),
                        budget_ms: budget.as_millis() as u64,
                    }
                    .to_string(),
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_stage_deadline_exceeded("ner");
                }
                let _ = elapsed;
                Vec::new()
            }
        };

        let elapsed = Instant::now().duration_since(started);
        result.record_stage_timing(StageKind::Ner, elapsed);
        for entity in &entities {
            for component_id in entity.source_ids.keys() {
                result.record_component_used(component_id.clone());
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_stage_duration("ner", elapsed.as_secs_f64());
        }
        self.observer.on_stage_completed(StageKind::Ner, elapsed, entities.len()).await;
        entities
    }

    async fn run_enrichment_stage(
        &self,
        entities: Vec<EntityRecord>,
        domain: Option<&str>,
        config: &PipelineConfig,
        result: &mut PipelineResult,
    ) -> Vec<EntityRecord> {
        if !config.is_stage_enabled(StageKind::Enrichment) {
            return entities;
        }
        self.observer.on_stage_started(StageKind::Enrichment).await;
        let budget = config.stage_budget(StageKind::Enrichment);
        let started = Instant::now();

        // Clone before handing ownership to `enrich`: a timeout drops the
        // in-flight future, which would otherwise lose the entities it
        // consumed by value rather than degrading to "entity unchanged".
        let fallback = entities.clone();
        let outcome = tokio::time::timeout(budget, self.enrichment.enrich(entities, domain, config)).await;
        let (entities, warnings) = match outcome {
            Ok(pair) => pair,
            Err(_) => {
                warn!(stage = "enrichment", budget_ms = budget.as_millis(), "enrichment stage exceeded its sub-deadline");
                result.push_warning(
                    EnrichmentError::StageDeadlineExceeded {
                        stage: "enrichment".into(),
                        budget_ms: budget.as_millis() as u64,
                    }
                    .to_string(),
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_stage_deadline_exceeded("enrichment");
                }
                (fallback, Vec::new())
            }
        };
        for warning in warnings {
            result.push_warning(warning);
        }

        let elapsed = Instant::now().duration_since(started);
        result.record_stage_timing(StageKind::Enrichment, elapsed);
        for entity in &entities {
            if entity.is_kb_linked() {
                if let Some(kb_id) = &entity.kb_id {
                    result.record_component_used(kb_id.clone());
                }
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_stage_duration("enrichment", elapsed.as_secs_f64());
        }
        self.observer.on_stage_completed(StageKind::Enrichment, elapsed, entities.len()).await;
        entities
    }

    async fn run_pattern_stage(
        &self,
        text: &str,
        domain: Option<&str>,
        config: &PipelineConfig,
        result: &mut PipelineResult,
    ) -> Vec<EntityRecord> {
        if !config.is_stage_enabled(StageKind::Patterns) {
            return Vec::new();
        }
        self.observer.on_stage_started(StageKind::Patterns).await;
        let budget = config.stage_budget(StageKind::Patterns);
        let started = Instant::now();

        let outcome = tokio::time::timeout(budget, self.patterns.match_patterns(text, domain, config)).await;
        let entities = match outcome {
            Ok(Ok(entities)) => entities,
            Ok(Err(err)) if !err.is_recoverable() => {
                result.push_error(err.to_string());
                Vec::new()
            }
            Ok(Err(err)) => {
                result.push_warning(err.to_string());
                Vec::new()
            }
            Err(_) => {
                result.push_warning(
                    EnrichmentError::StageDeadlineExceeded {
                        stage: "patterns".into(),
                        budget_ms: budget.as_millis() as u64,
                    }
                    .to_string(),
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_stage_deadline_exceeded("patterns");
                }
                Vec::new()
            }
        };

        let elapsed = Instant::now().duration_since(started);
        result.record_stage_timing(StageKind::Patterns, elapsed);
        for entity in &entities {
            for component_id in entity.source_ids.keys() {
                result.record_component_used(component_id.clone());
            }
        }
        if let Some(metrics) = &self.metrics {
            metrics.record_stage_duration("patterns", elapsed.as_secs_f64());
        }
        self.observer.on_stage_completed(StageKind::Patterns, elapsed, entities.len()).await;
        entities
    }

    /// Dedup, overlap resolution, and deterministic sort (§4.1's three
    /// post-processing rules). Runs synchronously; there is nothing to
    /// suspend on, so it has no sub-deadline check beyond the stage budget
    /// being recorded for telemetry symmetry with the other stages.
    fn post_process(&self, mut entities: Vec<EntityRecord>, config: &PipelineConfig) -> Vec<EntityRecord> {
        if config.post.deduplication_enabled {
            entities = dedup_entities(entities);
        }
        if config.post.merge_overlapping {
            entities = resolve_overlaps(entities);
        }
        entities.sort_by(|a, b| {
            a.span
                .start()
                .cmp(&b.span.start())
                .then(b.span.end().cmp(&a.span.end()))
                .then(a.entity_type.cmp(&b.entity_type))
        });
        entities
    }
}

/// Rule 1: two entities with the same `(start, end)` and the same type once
/// both sides pass through [`canonical_type`] are duplicates. The merged
/// entity keeps the higher confidence, unions `source_ids`, prefers
/// `validated = true`, then prefers the longer `canonical_name`.
fn dedup_entities(entities: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut merged: Vec<EntityRecord> = Vec::with_capacity(entities.len());
    for entity in entities {
        let key = (entity.span.start(), entity.span.end(), canonical_type(&entity.entity_type).to_string());
        if let Some(existing) = merged.iter_mut().find(|candidate| {
            (candidate.span.start(), candidate.span.end(), canonical_type(&candidate.entity_type).to_string()) == key
        }) {
            merge_into(existing, entity);
        } else {
            merged.push(entity);
        }
    }
    merged
}

fn merge_into(existing: &mut EntityRecord, other: EntityRecord) {
    for (component_id, confidence) in other.source_ids {
        existing
            .source_ids
            .entry(component_id)
            .and_modify(|current| {
                if confidence.value() > current.value() {
                    *current = confidence;
                }
            })
            .or_insert(confidence);
    }
    if other.confidence.value() > existing.confidence.value() {
        existing.confidence = other.confidence;
    }
    if other.validated && !existing.validated {
        existing.validated = true;
    }
    let existing_name_len = existing.canonical_name.as_deref().map(str::len).unwrap_or(0);
    let other_name_len = other.canonical_name.as_deref().map(str::len).unwrap_or(0);
    if other_name_len > existing_name_len {
        existing.canonical_name = other.canonical_name;
    }
    if existing.kb_id.is_none() && other.kb_id.is_some() {
        existing.kb_id = other.kb_id;
        existing.kb_entity_id = other.kb_entity_id;
        existing.definition = other.definition;
    }
    existing.semantic_types.extend(other.semantic_types);
    for (relation, targets) in other.relationships {
        existing.relationships.entry(relation).or_default().extend(targets);
    }
}

/// Rule 2: for spans that strictly overlap but are not identical
/// `(start, end)` pairs, a validated pattern entity whose span fully
/// contains an NER entity's span wins; otherwise both survive.
fn resolve_overlaps(entities: Vec<EntityRecord>) -> Vec<EntityRecord> {
    let mut suppressed = vec![false; entities.len()];
    for i in 0..entities.len() {
        if suppressed[i] {
            continue;
        }
        for j in 0..entities.len() {
            if i == j || suppressed[j] {
                continue;
            }
            let a = &entities[i];
            let b = &entities[j];
            if a.span == b.span {
                continue;
            }
            if !a.span.overlaps(b.span) {
                continue;
            }
            if a.source_stage == SourceStage::Pattern
                && a.validated
                && b.source_stage == SourceStage::Ner
                && a.span.contains(b.span)
            {
                suppressed[j] = true;
            }
        }
    }
    entities
        .into_iter()
        .zip(suppressed)
        .filter_map(|(entity, drop)| if drop { None } else { Some(entity) })
        .collect()
}

#[async_trait]
impl OrchestratorService for PipelineOrchestrator {
    async fn process(
        &self,
        text: &str,
        domain: Option<&str>,
        overrides: &HashMap<String, String>,
    ) -> Result<PipelineResult, EnrichmentError> {
        let request_started = Instant::now();
        let mut result = PipelineResult::empty();

        let config = self.config_loader.load(domain, overrides).await?;

        if text.trim().is_empty() {
            result.push_warning("request text is empty; no stages were run");
            self.observer.on_result(&result).await;
            return Ok(result);
        }
        let text = if text.len() > config.max_text_bytes {
            result.push_warning(format!(
                "request text truncated from {} to {} bytes",
                text.len(),
                config.max_text_bytes
            ));
            truncate_at_char_boundary(text, config.max_text_bytes)
        } else {
            text
        };

        let deadline_at = Instant::now() + config.total_deadline();
        info!(domain = domain.unwrap_or("generic"), deadline_ms = config.deadline_ms, "pipeline request started");

        let ner_entities = self.run_ner_stage(text, domain, &config, &mut result).await;
        if !result.errors.is_empty() {
            // A fatal NER error (NoModelsAvailable) was recorded; the spec
            // treats this as failing the whole request when NER is enabled.
            if let Some(metrics) = &self.metrics {
                metrics.record_request(request_started.elapsed().as_secs_f64(), true);
            }
            return Err(EnrichmentError::NoModelsAvailable { domain: domain.map(str::to_string) });
        }

        let entities = if Self::deadline_expired(deadline_at) {
            result.cancelled = true;
            result.push_warning(EnrichmentError::CancelRequested.to_string());
            ner_entities
        } else {
            self.run_enrichment_stage(ner_entities, domain, &config, &mut result).await
        };

        let pattern_entities = if Self::deadline_expired(deadline_at) || result.cancelled {
            if !result.cancelled {
                result.cancelled = true;
                result.push_warning(EnrichmentError::CancelRequested.to_string());
            }
            Vec::new()
        } else {
            self.run_pattern_stage(text, domain, &config, &mut result).await
        };

        let mut combined = entities;
        combined.extend(pattern_entities);

        let final_entities = if config.is_stage_enabled(StageKind::PostProcessing) {
            let started = Instant::now();
            let processed = self.post_process(combined, &config);
            result.record_stage_timing(StageKind::PostProcessing, started.elapsed());
            processed
        } else {
            combined
        };

        if let Some(metrics) = &self.metrics {
            for entity in &final_entities {
                let stage = match entity.source_stage {
                    SourceStage::Ner => "ner",
                    SourceStage::Pattern => "patterns",
                    SourceStage::Enriched => "enrichment",
                };
                metrics.record_entities_emitted(stage, 1);
            }
        }

        result.entities = final_entities;
        debug_assert!(result.has_unique_entities(), "post-processing must leave no duplicate (start,end,type) entities");

        if let Some(metrics) = &self.metrics {
            metrics.record_request(request_started.elapsed().as_secs_f64(), false);
        }
        self.observer.on_result(&result).await;
        Ok(result)
    }
}

fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    let mut end = max_bytes.min(text.len());
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrichment_domain::value_objects::{CharSpan, ConfidenceScore};

    fn entity(start: usize, end: usize, entity_type: &str, stage: SourceStage, validated: bool) -> EntityRecord {
        let mut record = EntityRecord::new(
            "x".repeat(end - start),
            entity_type,
            CharSpan::new(start, end).unwrap(),
            ConfidenceScore::new(0.8),
            stage,
            "test-component",
        );
        record.validated = validated;
        record
    }

    #[test]
    fn dedup_merges_identical_span_and_aliased_type() {
        let mut a = entity(0, 5, "DRUG", SourceStage::Ner, false);
        a.confidence = ConfidenceScore::new(0.6);
        let mut b = entity(0, 5, "MEDICATION", SourceStage::Pattern, true);
        b.confidence = ConfidenceScore::new(0.9);

        let merged = dedup_entities(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert!((merged[0].confidence.value() - 0.9).abs() < 1e-9);
        assert!(merged[0].validated);
        assert_eq!(merged[0].source_ids.len(), 2);
    }

    #[test]
    fn validated_pattern_span_containing_ner_span_suppresses_it() {
        let pattern = entity(0, 10, "ICD_CODE", SourceStage::Pattern, true);
        let ner = entity(2, 6, "DRUG", SourceStage::Ner, false);
        let resolved = resolve_overlaps(vec![pattern, ner]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_stage, SourceStage::Pattern);
    }

    #[test]
    fn unvalidated_pattern_does_not_suppress_overlapping_ner_entity() {
        let pattern = entity(0, 10, "ICD_CODE", SourceStage::Pattern, false);
        let ner = entity(2, 6, "DRUG", SourceStage::Ner, false);
        let resolved = resolve_overlaps(vec![pattern, ner]);
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo";
        let truncated = truncate_at_char_boundary(text, 2);
        assert!(text.is_char_boundary(truncated.len()));
    }

    fn fingerprint(entities: &[EntityRecord]) -> Vec<(usize, usize, String, String, bool)> {
        entities
            .iter()
            .map(|e| {
                (
                    e.span.start(),
                    e.span.end(),
                    e.entity_type.clone(),
                    format!("{:.6}", e.confidence.value()),
                    e.validated,
                )
            })
            .collect()
    }

    #[test]
    fn post_processing_is_idempotent() {
        let mut dup_a = entity(0, 5, "DRUG", SourceStage::Ner, false);
        dup_a.confidence = ConfidenceScore::new(0.6);
        let mut dup_b = entity(0, 5, "MEDICATION", SourceStage::Pattern, true);
        dup_b.confidence = ConfidenceScore::new(0.9);
        let suppressing_pattern = entity(10, 20, "ICD_CODE", SourceStage::Pattern, true);
        let suppressed_ner = entity(12, 16, "DISEASE", SourceStage::Ner, false);
        let standalone = entity(30, 35, "ROUTE", SourceStage::Pattern, true);

        let input = vec![dup_a, dup_b, suppressing_pattern, suppressed_ner, standalone];

        let mut once = resolve_overlaps(dedup_entities(input));
        once.sort_by(|a, b| a.span.start().cmp(&b.span.start()).then(b.span.end().cmp(&a.span.end())));

        let mut twice = resolve_overlaps(dedup_entities(once.clone()));
        twice.sort_by(|a, b| a.span.start().cmp(&b.span.start()).then(b.span.end().cmp(&a.span.end())));

        assert_eq!(fingerprint(&once), fingerprint(&twice));
    }
}
