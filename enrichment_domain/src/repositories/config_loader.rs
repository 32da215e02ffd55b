use crate::entities::PipelineConfig;
use crate::error::EnrichmentError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Produces a `PipelineConfig` for a `(domain, overrides)` pair by merging
/// the domain-default, global, and per-request override layers (§3).
#[async_trait]
pub trait ConfigLoader: Send + Sync {
    async fn load(
        &self,
        domain: Option<&str>,
        overrides: &HashMap<String, String>,
    ) -> Result<PipelineConfig, EnrichmentError>;
}
