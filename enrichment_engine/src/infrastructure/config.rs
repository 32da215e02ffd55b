//! Layered `PipelineConfig` loader: domain-default, global, and per-request
//! override layers merged in that order, with an environment-variable
//! overlay (via the `config` crate) slotted in between the global file and
//! the per-request override, for deployment-time numeric knob tweaks that
//! shouldn't require editing a checked-in TOML file.
//!
//! Grounded on the teacher's `ConfigService::load_observability_config`
//! fallback-to-default-on-missing-file pattern, generalized from a single
//! flat settings struct to the three-layer merge this engine's config
//! needs.

use async_trait::async_trait;
use enrichment_domain::entities::{
    EnrichmentConfig, NerConfig, OptimizerConfig, PatternConfig, PipelineConfig,
    PostProcessingConfig, StageFractions, StageKind, TrustPolicy,
};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::ConfigLoader;
use enrichment_domain::value_objects::{ConcurrencyCap, ConfidenceScore};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct NerOverlay {
    model_ids: Option<Vec<String>>,
    min_f1: Option<f64>,
    max_latency_ms: Option<u64>,
    min_models: Option<usize>,
    max_models: Option<usize>,
    min_confidence: Option<ConfidenceScore>,
    ensemble_mode: Option<bool>,
    min_models_for_quorum: Option<usize>,
}

impl NerOverlay {
    fn apply_to(self, base: &mut NerConfig) {
        if let Some(v) = self.model_ids { base.model_ids = v; }
        if let Some(v) = self.min_f1 { base.min_f1 = v; }
        if let Some(v) = self.max_latency_ms { base.max_latency_ms = v; }
        if let Some(v) = self.min_models { base.min_models = v; }
        if let Some(v) = self.max_models { base.max_models = v; }
        if let Some(v) = self.min_confidence { base.min_confidence = v; }
        if let Some(v) = self.ensemble_mode { base.ensemble_mode = v; }
        if let Some(v) = self.min_models_for_quorum { base.min_models_for_quorum = v; }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct KbOverlay {
    chain_by_domain: Option<HashMap<String, Vec<String>>>,
    enrich_all: Option<bool>,
    min_confidence_for_enrichment: Option<ConfidenceScore>,
    per_lookup_timeout_ms: Option<u64>,
    max_concurrent: Option<ConcurrencyCap>,
}

impl KbOverlay {
    fn apply_to(self, base: &mut EnrichmentConfig) {
        if let Some(v) = self.chain_by_domain {
            base.chain_by_domain.extend(v);
        }
        if let Some(v) = self.enrich_all { base.enrich_all = v; }
        if let Some(v) = self.min_confidence_for_enrichment { base.min_confidence_for_enrichment = v; }
        if let Some(v) = self.per_lookup_timeout_ms { base.per_lookup_timeout_ms = v; }
        if let Some(v) = self.max_concurrent { base.max_concurrent = v; }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PatternOverlay {
    domains: Option<Vec<String>>,
    min_confidence: Option<ConfidenceScore>,
    auto_detect_domain: Option<bool>,
}

impl PatternOverlay {
    fn apply_to(self, base: &mut PatternConfig) {
        if let Some(v) = self.domains { base.domains = v; }
        if let Some(v) = self.min_confidence { base.min_confidence = v; }
        if let Some(v) = self.auto_detect_domain { base.auto_detect_domain = v; }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct PostOverlay {
    deduplication_enabled: Option<bool>,
    merge_overlapping: Option<bool>,
}

impl PostOverlay {
    fn apply_to(self, base: &mut PostProcessingConfig) {
        if let Some(v) = self.deduplication_enabled { base.deduplication_enabled = v; }
        if let Some(v) = self.merge_overlapping { base.merge_overlapping = v; }
    }
}

/// Partial, all-optional mirror of [`PipelineConfig`], deserialized from a
/// TOML file or an environment overlay and merged field-by-field onto a
/// base config. A field absent from the source leaves the base unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigOverlay {
    enabled_stages: Option<HashSet<StageKind>>,
    ner: Option<NerOverlay>,
    kb: Option<KbOverlay>,
    patterns: Option<PatternOverlay>,
    post: Option<PostOverlay>,
    deadline_ms: Option<u64>,
    per_stage_fractions: Option<StageFractions>,
    trust_policy: Option<TrustPolicy>,
    optimizer: Option<OptimizerConfig>,
    max_text_bytes: Option<usize>,
}

impl ConfigOverlay {
    fn apply_to(self, base: &mut PipelineConfig) {
        if let Some(v) = self.enabled_stages { base.enabled_stages = v; }
        if let Some(v) = self.ner { v.apply_to(&mut base.ner); }
        if let Some(v) = self.kb { v.apply_to(&mut base.kb); }
        if let Some(v) = self.patterns { v.apply_to(&mut base.patterns); }
        if let Some(v) = self.post { v.apply_to(&mut base.post); }
        if let Some(v) = self.deadline_ms { base.deadline_ms = v; }
        if let Some(v) = self.per_stage_fractions { base.per_stage_fractions = v; }
        if let Some(v) = self.trust_policy { base.trust_policy = v; }
        if let Some(v) = self.optimizer { base.optimizer = v; }
        if let Some(v) = self.max_text_bytes { base.max_text_bytes = v; }
    }
}

/// Parses a string override value into the scalar field it targets, for the
/// small set of dotted keys a per-request override is expected to carry
/// (the deadline and the handful of threshold/toggle knobs a caller tunes
/// per call; structural knobs like KB chains stay in the file layers).
fn apply_string_overrides(
    config: &mut PipelineConfig,
    overrides: &HashMap<String, String>,
) -> Result<(), EnrichmentError> {
    for (key, value) in overrides {
        match key.as_str() {
            "deadline_ms" => {
                config.deadline_ms = parse_override(key, value)?;
            }
            "ner.min_confidence" => {
                config.ner.min_confidence = ConfidenceScore::new(parse_override(key, value)?);
            }
            "ner.max_models" => {
                config.ner.max_models = parse_override(key, value)?;
            }
            "kb.enrich_all" => {
                config.kb.enrich_all = parse_override(key, value)?;
            }
            "kb.min_confidence_for_enrichment" => {
                config.kb.min_confidence_for_enrichment = ConfidenceScore::new(parse_override(key, value)?);
            }
            "patterns.min_confidence" => {
                config.patterns.min_confidence = ConfidenceScore::new(parse_override(key, value)?);
            }
            "post.deduplication_enabled" => {
                config.post.deduplication_enabled = parse_override(key, value)?;
            }
            "post.merge_overlapping" => {
                config.post.merge_overlapping = parse_override(key, value)?;
            }
            other => {
                warn!(key = %other, "ignoring unrecognized per-request config override");
            }
        }
    }
    Ok(())
}

fn parse_override<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, EnrichmentError> {
    value
        .parse::<T>()
        .map_err(|_| EnrichmentError::invalid_config(format!("override {key}={value} is not valid")))
}

/// Loads [`PipelineConfig`] by merging, in increasing precedence: a
/// domain-default TOML file, a global TOML file, an environment overlay,
/// and the per-request override map. Any layer that is absent (no path
/// configured, or the file does not exist) is skipped rather than treated
/// as an error; only malformed content that *is* present surfaces
/// [`EnrichmentError::ConfigInvalid`].
pub struct TomlConfigLoader {
    domain_defaults_dir: Option<PathBuf>,
    global_config_path: Option<PathBuf>,
    env_prefix: String,
}

impl TomlConfigLoader {
    pub fn new() -> Self {
        TomlConfigLoader {
            domain_defaults_dir: None,
            global_config_path: None,
            env_prefix: "ENRICHMENT".to_string(),
        }
    }

    pub fn with_domain_defaults_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.domain_defaults_dir = Some(dir.into());
        self
    }

    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    async fn read_overlay(path: &Path) -> Result<Option<ConfigOverlay>, EnrichmentError> {
        if !path.exists() {
            debug!(path = %path.display(), "config layer not present, skipping");
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(path).await.map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to read config file {}: {err}", path.display()))
        })?;

        let overlay: ConfigOverlay = toml::from_str(&content).map_err(|err| {
            EnrichmentError::invalid_config(format!("failed to parse config file {}: {err}", path.display()))
        })?;

        Ok(Some(overlay))
    }

    fn read_env_overlay(&self) -> Result<ConfigOverlay, EnrichmentError> {
        let source = config::Environment::with_prefix(&self.env_prefix)
            .separator("__")
            .try_parsing(true);

        let built = config::Config::builder()
            .add_source(source)
            .build()
            .map_err(|err| EnrichmentError::invalid_config(format!("invalid environment overlay: {err}")))?;

        built
            .try_deserialize::<ConfigOverlay>()
            .map_err(|err| EnrichmentError::invalid_config(format!("invalid environment overlay: {err}")))
    }
}

impl Default for TomlConfigLoader {
    fn default() -> Self {
        TomlConfigLoader::new()
    }
}

#[async_trait]
impl ConfigLoader for TomlConfigLoader {
    async fn load(
        &self,
        domain: Option<&str>,
        overrides: &HashMap<String, String>,
    ) -> Result<PipelineConfig, EnrichmentError> {
        let mut config = PipelineConfig::default();

        if let (Some(domain), Some(dir)) = (domain, &self.domain_defaults_dir) {
            let path = dir.join(format!("{domain}.toml"));
            if let Some(overlay) = Self::read_overlay(&path).await? {
                overlay.apply_to(&mut config);
            }
        }

        if let Some(path) = &self.global_config_path {
            if let Some(overlay) = Self::read_overlay(path).await? {
                overlay.apply_to(&mut config);
            }
        }

        self.read_env_overlay()?.apply_to(&mut config);

        apply_string_overrides(&mut config, overrides)?;

        if !config.per_stage_fractions.is_valid() {
            return Err(EnrichmentError::invalid_config("per_stage_fractions must sum to 1.0"));
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    async fn write_file(path: &Path, content: &str) {
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn domain_default_layer_applies_when_no_global_file_present() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("medical.toml"), "deadline_ms = 12345\n").await;

        let loader = TomlConfigLoader::new().with_domain_defaults_dir(dir.path());
        let config = loader.load(Some("medical"), &HashMap::new()).await.unwrap();
        assert_eq!(config.deadline_ms, 12345);
    }

    #[tokio::test]
    async fn global_layer_overrides_domain_default() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("medical.toml"), "deadline_ms = 1000\n").await;
        let global_path = dir.path().join("global.toml");
        write_file(&global_path, "deadline_ms = 2000\n").await;

        let loader = TomlConfigLoader::new()
            .with_domain_defaults_dir(dir.path())
            .with_global_config(&global_path);
        let config = loader.load(Some("medical"), &HashMap::new()).await.unwrap();
        assert_eq!(config.deadline_ms, 2000);
    }

    #[tokio::test]
    async fn per_request_override_wins_over_both_file_layers() {
        let dir = tempdir().unwrap();
        write_file(&dir.path().join("medical.toml"), "deadline_ms = 1000\n").await;
        let global_path = dir.path().join("global.toml");
        write_file(&global_path, "deadline_ms = 2000\n").await;

        let loader = TomlConfigLoader::new()
            .with_domain_defaults_dir(dir.path())
            .with_global_config(&global_path);

        let mut overrides = HashMap::new();
        overrides.insert("deadline_ms".to_string(), "3000".to_string());

        let config = loader.load(Some("medical"), &overrides).await.unwrap();
        assert_eq!(config.deadline_ms, 3000);
    }

    #[tokio::test]
    async fn malformed_toml_surfaces_config_invalid() {
        let dir = tempdir().unwrap();
        let global_path = dir.path().join("global.toml");
        write_file(&global_path, "deadline_ms = [this is not valid\n").await;

        let loader = TomlConfigLoader::new().with_global_config(&global_path);
        let result = loader.load(None, &HashMap::new()).await;
        assert!(matches!(result, Err(EnrichmentError::ConfigInvalid { .. })));
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let loader = TomlConfigLoader::new()
            .with_global_config("/nonexistent/global.toml")
            .with_domain_defaults_dir("/nonexistent/domains");
        let config = loader.load(Some("medical"), &HashMap::new()).await.unwrap();
        assert_eq!(config.deadline_ms, PipelineConfig::default().deadline_ms);
    }
}
