use crate::entities::{EntityRecord, PipelineConfig};
use crate::error::EnrichmentError;
use async_trait::async_trait;

/// `Extract(text, domain, config) → list<EntityRecord>` (§4.2).
#[async_trait]
pub trait NerStageService: Send + Sync {
    async fn extract(
        &self,
        text: &str,
        domain: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<EntityRecord>, EnrichmentError>;
}

/// Enriches `entities` in place against the domain's KB chain (§4.3).
/// Per-entity failures are captured as warnings by the implementation and
/// never surfaced as an `Err` here; this method only fails for conditions
/// that make the whole stage meaningless (none are currently defined —
/// enrichment degrades gracefully to "entity unchanged" at every level).
#[async_trait]
pub trait EnrichmentStageService: Send + Sync {
    async fn enrich(
        &self,
        entities: Vec<EntityRecord>,
        domain: Option<&str>,
        config: &PipelineConfig,
    ) -> (Vec<EntityRecord>, Vec<String>);
}

/// `Match(text, domain, config) → list<EntityRecord>` (§4.4).
#[async_trait]
pub trait PatternStageService: Send + Sync {
    async fn match_patterns(
        &self,
        text: &str,
        domain: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<EntityRecord>, EnrichmentError>;
}
