//! End-to-end scenario tests driving a real `PipelineOrchestrator` with the
//! engine's own infrastructure (hot-swap manager, chain enrichment, regex
//! patterns) wired to the `testing` fakes in place of real models/KBs.
//! Mirrors the teacher's integration-test style: real collaborators, fake
//! leaves, no mocking framework.

use async_trait::async_trait;
use enrichment_domain::entities::{ComponentDescriptor, ComponentKind, PipelineConfig, TrustLevel, TrustPolicy};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::{ConfigLoader, KbLookupResult, NerHit, NerModel};
use enrichment_domain::services::{HotSwapManager, OrchestratorService, TrustValidator};
use enrichment_engine::application::PipelineOrchestrator;
use enrichment_engine::infrastructure::cache::MultiTierCache;
use enrichment_engine::infrastructure::hotswap::{AlwaysHealthy, InMemoryHotSwapManager};
use enrichment_engine::infrastructure::kb::ChainEnrichmentStage;
use enrichment_engine::infrastructure::ner::EnsembleNerStage;
use enrichment_engine::infrastructure::patterns::{BuiltinPatternMatcher, RegexPatternStage};
use enrichment_engine::infrastructure::PolicyTrustValidator;
use enrichment_engine::testing::{FakeKbProvider, FakeNerModel, KbLookupBehavior};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

/// Always returns the same pre-built config, ignoring overrides — the
/// per-request override path itself is covered at unit scope in
/// `infrastructure/config.rs`.
struct StaticConfigLoader(PipelineConfig);

#[async_trait]
impl ConfigLoader for StaticConfigLoader {
    async fn load(
        &self,
        _domain: Option<&str>,
        _overrides: &HashMap<String, String>,
    ) -> Result<PipelineConfig, EnrichmentError> {
        Ok(self.0.clone())
    }
}

fn descriptor(kind: ComponentKind, id: &str) -> ComponentDescriptor {
    ComponentDescriptor {
        kind,
        id: id.to_string(),
        version: "1.0".into(),
        source_url: "https://models.example".into(),
        domains: HashSet::new(),
        declared_capabilities: HashSet::new(),
        checksum: None,
        trust_level: TrustLevel::Trusted,
    }
}

async fn orchestrator_with(
    ner_models: Vec<(&str, FakeNerModel)>,
    kb_providers: Vec<(&str, FakeKbProvider)>,
    config: PipelineConfig,
) -> PipelineOrchestrator {
    let ner_manager: Arc<InMemoryHotSwapManager<dyn NerModel>> =
        Arc::new(InMemoryHotSwapManager::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy)));
    for (id, model) in ner_models {
        let model: Arc<dyn NerModel> = Arc::new(model);
        ner_manager.register(descriptor(ComponentKind::NerModel, id), model).await.unwrap();
    }
    let ner_stage = Arc::new(EnsembleNerStage::new(ner_manager));

    let mut providers: HashMap<String, Arc<dyn enrichment_domain::repositories::KbProvider>> = HashMap::new();
    for (id, provider) in kb_providers {
        providers.insert(id.to_string(), Arc::new(provider));
    }
    let cache = Arc::new(MultiTierCache::new(128, None, None));
    let enrichment_stage = Arc::new(ChainEnrichmentStage::new(providers, cache));

    let pattern_stage = Arc::new(RegexPatternStage::new(BuiltinPatternMatcher));

    let config_loader = Arc::new(StaticConfigLoader(config));

    PipelineOrchestrator::new(config_loader, ner_stage, enrichment_stage, pattern_stage)
}

fn medical_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.deadline_ms = 5_000;
    config.ner.min_confidence = enrichment_domain::value_objects::ConfidenceScore::new(0.5);
    config
}

/// S1 — Medical, single NER model, UMLS enriches.
#[tokio::test]
async fn s1_single_model_with_pattern_matches_and_umls_enrichment() {
    let text = "Patient prescribed Lisinopril 10 mg PO daily for I10";
    let ner = FakeNerModel::new(
        vec![NerHit { text: "Lisinopril".into(), entity_type: "DRUG".into(), start: 19, end: 29, confidence: 0.92 }],
        0.9,
        100.0,
    );
    let umls = FakeKbProvider::new("umls").with_answer(
        "lisinopril",
        "DRUG",
        KbLookupBehavior::Hit(KbLookupResult {
            entity_id: "rx-1".into(),
            canonical_name: "Lisinopril".into(),
            definition: Some("ACE inhibitor".into()),
            semantic_types: HashSet::new(),
            relationships: HashMap::new(),
        }),
    );

    let orchestrator = orchestrator_with(vec![("model-a", ner)], vec![("umls", umls)], medical_config()).await;
    let result = orchestrator.process(text, Some("medical"), &HashMap::new()).await.unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.entities.len(), 4, "Lisinopril, 10 mg, PO, I10: {:?}", result.entities);

    let lisinopril = result.entities.iter().find(|e| e.text == "Lisinopril").unwrap();
    assert_eq!(lisinopril.kb_id.as_deref(), Some("umls"));

    let icd = result.entities.iter().find(|e| e.entity_type == "ICD_CODE").unwrap();
    assert!(icd.validated);

    let order: Vec<&str> = result.entities.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(order, vec!["Lisinopril", "10 mg", "PO", "I10"]);
}

/// S2 — Two-model ensemble, disagreement: higher summed confidence wins the
/// type, fused confidence includes the two-model agreement boost.
#[tokio::test]
async fn s2_two_model_ensemble_disagreement_resolves_by_summed_confidence() {
    let model_a = FakeNerModel::new(
        vec![NerHit { text: "Aspirin".into(), entity_type: "DRUG".into(), start: 0, end: 7, confidence: 0.8 }],
        0.9,
        100.0,
    );
    let model_b = FakeNerModel::new(
        vec![NerHit { text: "Aspirin".into(), entity_type: "CHEMICAL".into(), start: 0, end: 7, confidence: 0.7 }],
        0.9,
        100.0,
    );

    let mut config = medical_config();
    config.ner.min_models = 2;
    config.ner.max_models = 2;
    config.ner.min_models_for_quorum = 2;

    let orchestrator = orchestrator_with(vec![("model-a", model_a), ("model-b", model_b)], vec![], config).await;
    let result = orchestrator.process("Aspirin", Some("medical"), &HashMap::new()).await.unwrap();

    assert_eq!(result.entities.len(), 1);
    let entity = &result.entities[0];
    assert_eq!(entity.entity_type, "DRUG");
    // mean(votes_for_winning_type) = 0.8 (model A's vote only, per the
    // fusion rule's own wording), agreement_boost = 0.10 * 1/2 = 0.05.
    assert!((entity.confidence.value() - 0.85).abs() < 1e-9, "got {}", entity.confidence.value());
}

/// S3 — KB chain fallback: first KB times out, second answers.
#[tokio::test]
async fn s3_kb_chain_falls_through_after_timeout() {
    let ner = FakeNerModel::new(
        vec![NerHit { text: "Morphine".into(), entity_type: "DRUG".into(), start: 0, end: 8, confidence: 0.9 }],
        0.9,
        50.0,
    );
    let umls = FakeKbProvider::new("umls").with_delay(Duration::from_secs(3600));
    let rxnorm = FakeKbProvider::new("rxnorm").with_answer(
        "morphine",
        "DRUG",
        KbLookupBehavior::Hit(KbLookupResult {
            entity_id: "rx-9".into(),
            canonical_name: "Morphine".into(),
            definition: None,
            semantic_types: HashSet::new(),
            relationships: HashMap::new(),
        }),
    );

    let mut config = medical_config();
    config.kb.per_lookup_timeout_ms = 50;

    let orchestrator =
        orchestrator_with(vec![("model-a", ner)], vec![("umls", umls), ("rxnorm", rxnorm)], config).await;
    let result = orchestrator.process("Morphine", Some("medical"), &HashMap::new()).await.unwrap();

    assert_eq!(result.entities.len(), 1);
    assert_eq!(result.entities[0].kb_id.as_deref(), Some("rxnorm"));
}

/// S4 — Stage deadline: NER models all exceed the stage sub-deadline, the
/// request still returns a result with a deadline-exceeded warning.
#[tokio::test]
async fn s4_ner_stage_deadline_returns_partial_result_with_warning() {
    let slow_model = FakeNerModel::new(
        vec![NerHit { text: "Aspirin".into(), entity_type: "DRUG".into(), start: 0, end: 7, confidence: 0.9 }],
        0.9,
        100.0,
    )
    .with_delay(Duration::from_millis(800));

    let mut config = medical_config();
    config.deadline_ms = 1_000;
    config.per_stage_fractions = enrichment_domain::entities::StageFractions {
        ner: 0.5,
        enrichment: 0.35,
        patterns: 0.1,
        post_processing: 0.05,
    };
    config.enabled_stages = [enrichment_domain::entities::StageKind::Ner].into_iter().collect();

    let orchestrator = orchestrator_with(vec![("model-a", slow_model)], vec![], config).await;
    let result = orchestrator.process("Aspirin", Some("medical"), &HashMap::new()).await.unwrap();

    assert!(result.entities.is_empty());
    assert!(result.warnings.iter().any(|w| w.contains("ner") && w.contains("sub-deadline")));
}

/// Boundary: empty text short-circuits to an empty, error-free result.
#[tokio::test]
async fn empty_text_short_circuits_with_no_errors() {
    let orchestrator = orchestrator_with(vec![], vec![], medical_config()).await;
    let result = orchestrator.process("   ", Some("medical"), &HashMap::new()).await.unwrap();

    assert!(result.entities.is_empty());
    assert!(result.errors.is_empty());
}

/// Boundary: no eligible NER model makes the whole request fail with
/// `NoModelsAvailable`, per the error taxonomy's one NER-stage fatal case.
#[tokio::test]
async fn no_eligible_ner_models_fails_the_request() {
    let orchestrator = orchestrator_with(vec![], vec![], medical_config()).await;
    let err = orchestrator.process("Aspirin", Some("medical"), &HashMap::new()).await.unwrap_err();
    assert!(matches!(err, EnrichmentError::NoModelsAvailable { .. }));
}

/// S5 — Hot-swap mid-request: an in-flight request holding a lease on the
/// previous NER instance must complete against it even after the operator
/// executes a swap; the next acquire sees the new instance.
#[tokio::test]
async fn s5_hot_swap_mid_request_completes_in_flight_lease_on_old_instance() {
    let manager = Arc::new(InMemoryHotSwapManager::new(ComponentKind::NerModel, Arc::new(AlwaysHealthy)));
    let model_v1 = FakeNerModel::new(
        vec![NerHit { text: "Aspirin".into(), entity_type: "DRUG".into(), start: 0, end: 7, confidence: 0.9 }],
        0.9,
        100.0,
    );
    manager.register(descriptor(ComponentKind::NerModel, "model-a"), Arc::new(model_v1)).await.unwrap();

    // Hold a lease as if a request were mid-extraction against the old
    // instance, then swap underneath it.
    let in_flight = manager.acquire("model-a").expect("v1 should be ready");

    let model_v2 = FakeNerModel::new(
        vec![NerHit { text: "Aspirin".into(), entity_type: "CHEMICAL".into(), start: 0, end: 7, confidence: 0.95 }],
        0.95,
        100.0,
    );
    let prepared = manager.prepare_swap("model-a", Arc::new(model_v2), "2.0".into()).await.unwrap();
    assert!(prepared);
    manager.execute_swap("model-a", Duration::from_millis(1)).await.unwrap();

    // The in-flight lease still resolves against v1's fixed hit set.
    let v1_hits = in_flight.instance().extract("Aspirin").await.unwrap();
    assert_eq!(v1_hits[0].entity_type, "DRUG");
    drop(in_flight);

    // The next request gets v2.
    let next = manager.acquire("model-a").expect("v2 should be ready after swap");
    let v2_hits = next.instance().extract("Aspirin").await.unwrap();
    assert_eq!(v2_hits[0].entity_type, "CHEMICAL");
}

/// S6 — Trust rejection: a KB provider behind an http:// URL under a
/// policy requiring https is classified as rejected by `PolicyTrustValidator`
/// and is therefore never added to the chain-enrichment provider map. A
/// domain config that still references it by id resolves through the rest
/// of the chain (or falls through with a warning) and the rejected
/// provider's `lookup` is never invoked.
#[tokio::test]
async fn s6_trust_rejected_kb_provider_never_appears_in_chain() {
    let mut allow_list = HashSet::new();
    allow_list.insert("http://kb.untrusted.example".to_string());
    allow_list.insert("https://kb.trusted.example".to_string());
    let mut required_scheme_by_kind = HashMap::new();
    required_scheme_by_kind.insert(ComponentKind::KbProvider.to_string(), "https".to_string());
    let policy = TrustPolicy {
        min_trust_level_by_kind: HashMap::new(),
        required_scheme_by_kind,
        allow_list,
        blocked_list: HashSet::new(),
        checksum_required: false,
    };

    let rejected_descriptor = ComponentDescriptor {
        kind: ComponentKind::KbProvider,
        id: "rejected-kb".to_string(),
        version: "1.0".into(),
        source_url: "http://kb.untrusted.example".to_string(),
        domains: HashSet::new(),
        declared_capabilities: HashSet::new(),
        checksum: None,
        trust_level: TrustLevel::Unverified,
    };
    let validator = PolicyTrustValidator;
    assert!(!validator.is_allowed(&rejected_descriptor, &policy), "http provider must be rejected under an https-only policy");

    let rejected_provider = FakeKbProvider::new("rejected-kb").with_answer(
        "morphine",
        "DRUG",
        KbLookupBehavior::Hit(KbLookupResult {
            entity_id: "x".into(),
            canonical_name: "Morphine".into(),
            definition: None,
            semantic_types: HashSet::new(),
            relationships: HashMap::new(),
        }),
    );

    // The registration caller only inserts providers that pass trust
    // classification — `rejected-kb` never makes it into the map even
    // though `chain_by_domain` below still names it.
    let mut providers: HashMap<String, FakeKbProvider> = HashMap::new();
    if validator.is_allowed(&rejected_descriptor, &policy) {
        providers.insert("rejected-kb".to_string(), rejected_provider);
    }
    assert!(providers.is_empty());

    let ner = FakeNerModel::new(
        vec![NerHit { text: "Morphine".into(), entity_type: "DRUG".into(), start: 0, end: 8, confidence: 0.9 }],
        0.9,
        100.0,
    );

    let mut config = medical_config();
    config.kb.chain_by_domain.insert("medical".to_string(), vec!["rejected-kb".to_string()]);

    // `providers` stays empty; the orchestrator is wired with no KB
    // providers at all, mirroring what the caller would build after
    // filtering rejects out.
    let orchestrator = orchestrator_with(vec![("model-a", ner)], vec![], config).await;
    let result = orchestrator.process("Morphine", Some("medical"), &HashMap::new()).await.unwrap();

    assert_eq!(result.entities.len(), 1);
    assert!(result.entities[0].kb_id.is_none(), "the rejected KB must never enrich the entity");
    assert!(
        result.warnings.iter().any(|w| w.contains("no KB in chain")),
        "falling through an all-rejected chain must surface a warning: {:?}",
        result.warnings
    );
}
