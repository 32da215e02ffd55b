use crate::entities::{ComponentKind, TrustLevel};
use crate::value_objects::{ConcurrencyCap, ConfidenceScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The four pipeline stages, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageKind {
    Ner,
    Enrichment,
    Patterns,
    PostProcessing,
}

/// Optimizer scoring strategy, selecting which metric(s) dominate the
/// weighted score (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizerStrategy {
    Latency,
    Accuracy,
    Throughput,
    Balanced,
    Cost,
}

impl Default for OptimizerStrategy {
    fn default() -> Self {
        OptimizerStrategy::Balanced
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerConfig {
    /// Explicit model id list; empty means "use selection criteria" (§4.2).
    pub model_ids: Vec<String>,
    pub min_f1: f64,
    pub max_latency_ms: u64,
    pub min_models: usize,
    pub max_models: usize,
    pub min_confidence: ConfidenceScore,
    pub ensemble_mode: bool,
    pub min_models_for_quorum: usize,
}

impl Default for NerConfig {
    fn default() -> Self {
        NerConfig {
            model_ids: Vec::new(),
            min_f1: 0.0,
            max_latency_ms: 2_000,
            min_models: 1,
            max_models: 3,
            min_confidence: ConfidenceScore::new(0.7),
            ensemble_mode: true,
            min_models_for_quorum: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    pub chain_by_domain: HashMap<String, Vec<String>>,
    pub enrich_all: bool,
    pub min_confidence_for_enrichment: ConfidenceScore,
    pub per_lookup_timeout_ms: u64,
    pub max_concurrent: ConcurrencyCap,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        let mut chain_by_domain = HashMap::new();
        chain_by_domain.insert(
            "medical".to_string(),
            vec!["umls".into(), "rxnorm".into(), "snomed".into()],
        );
        chain_by_domain.insert(
            "legal".to_string(),
            vec!["usc".into(), "courtlistener".into(), "cfr".into()],
        );
        chain_by_domain.insert(
            "scientific".to_string(),
            vec!["umls".into(), "pubchem".into()],
        );
        EnrichmentConfig {
            chain_by_domain,
            enrich_all: false,
            min_confidence_for_enrichment: ConfidenceScore::new(0.7),
            per_lookup_timeout_ms: 5_000,
            max_concurrent: ConcurrencyCap::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternConfig {
    pub domains: Vec<String>,
    pub min_confidence: ConfidenceScore,
    pub auto_detect_domain: bool,
}

impl Default for PatternConfig {
    fn default() -> Self {
        PatternConfig {
            domains: Vec::new(),
            min_confidence: ConfidenceScore::new(0.0),
            auto_detect_domain: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PostProcessingConfig {
    pub deduplication_enabled: bool,
    pub merge_overlapping: bool,
}

impl Default for PostProcessingConfig {
    fn default() -> Self {
        PostProcessingConfig {
            deduplication_enabled: true,
            merge_overlapping: true,
        }
    }
}

/// `HashMap` keys here are `ComponentKind::to_string()` rather than the enum
/// itself: config round-trips through TOML/JSON, and both require string map
/// keys, so the enum-keyed form would fail to (de)serialize at the config
/// boundary despite compiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustPolicy {
    pub min_trust_level_by_kind: HashMap<String, TrustLevel>,
    pub required_scheme_by_kind: HashMap<String, String>,
    pub allow_list: std::collections::HashSet<String>,
    pub blocked_list: std::collections::HashSet<String>,
    pub checksum_required: bool,
}

impl TrustPolicy {
    pub fn min_trust_level(&self, kind: ComponentKind) -> TrustLevel {
        self.min_trust_level_by_kind
            .get(&kind.to_string())
            .copied()
            .unwrap_or(TrustLevel::Trusted)
    }

    pub fn required_scheme(&self, kind: ComponentKind) -> Option<&str> {
        self.required_scheme_by_kind.get(&kind.to_string()).map(String::as_str)
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        let mut min_trust_level_by_kind = HashMap::new();
        min_trust_level_by_kind.insert(ComponentKind::NerModel.to_string(), TrustLevel::Verified);
        min_trust_level_by_kind.insert(ComponentKind::KbProvider.to_string(), TrustLevel::Trusted);
        min_trust_level_by_kind
            .insert(ComponentKind::PatternMatcher.to_string(), TrustLevel::Verified);

        let mut required_scheme_by_kind = HashMap::new();
        required_scheme_by_kind.insert(ComponentKind::KbProvider.to_string(), "https".to_string());

        TrustPolicy {
            min_trust_level_by_kind,
            required_scheme_by_kind,
            allow_list: std::collections::HashSet::new(),
            blocked_list: std::collections::HashSet::new(),
            checksum_required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptimizerConfig {
    pub strategy: OptimizerStrategy,
    pub min_samples: usize,
    pub performance_threshold: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        OptimizerConfig {
            strategy: OptimizerStrategy::Balanced,
            min_samples: 10,
            performance_threshold: 0.05,
        }
    }
}

/// Per-stage share of the overall request deadline. Must sum to 1.0; the
/// default matches §4.1: NER 50%, enrichment 35%, patterns 10%,
/// post-processing 5%.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StageFractions {
    pub ner: f64,
    pub enrichment: f64,
    pub patterns: f64,
    pub post_processing: f64,
}

impl Default for StageFractions {
    fn default() -> Self {
        StageFractions {
            ner: 0.50,
            enrichment: 0.35,
            patterns: 0.10,
            post_processing: 0.05,
        }
    }
}

impl StageFractions {
    pub fn share(&self, stage: StageKind) -> f64 {
        match stage {
            StageKind::Ner => self.ner,
            StageKind::Enrichment => self.enrichment,
            StageKind::Patterns => self.patterns,
            StageKind::PostProcessing => self.post_processing,
        }
    }

    pub fn is_valid(&self) -> bool {
        let total = self.ner + self.enrichment + self.patterns + self.post_processing;
        (total - 1.0).abs() < 1e-6
    }
}

/// Request-scoped, immutable snapshot of every pipeline knob, produced by
/// merging a domain-default layer, a global layer, and a per-request
/// override layer (last one wins per field). Lives for exactly one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub enabled_stages: std::collections::HashSet<StageKind>,
    pub ner: NerConfig,
    pub kb: EnrichmentConfig,
    pub patterns: PatternConfig,
    pub post: PostProcessingConfig,
    pub deadline_ms: u64,
    pub per_stage_fractions: StageFractions,
    pub trust_policy: TrustPolicy,
    pub optimizer: OptimizerConfig,
    pub max_text_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            enabled_stages: [
                StageKind::Ner,
                StageKind::Enrichment,
                StageKind::Patterns,
                StageKind::PostProcessing,
            ]
            .into_iter()
            .collect(),
            ner: NerConfig::default(),
            kb: EnrichmentConfig::default(),
            patterns: PatternConfig::default(),
            post: PostProcessingConfig::default(),
            deadline_ms: 30_000,
            per_stage_fractions: StageFractions::default(),
            trust_policy: TrustPolicy::default(),
            optimizer: OptimizerConfig::default(),
            max_text_bytes: 100 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn is_stage_enabled(&self, stage: StageKind) -> bool {
        self.enabled_stages.contains(&stage)
    }

    pub fn stage_budget(&self, stage: StageKind) -> Duration {
        let fraction = self.per_stage_fractions.share(stage);
        Duration::from_millis((self.deadline_ms as f64 * fraction) as u64)
    }

    pub fn total_deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}
