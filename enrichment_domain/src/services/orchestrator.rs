use crate::entities::PipelineResult;
use crate::error::EnrichmentError;
use async_trait::async_trait;
use std::collections::HashMap;

/// `Process(text, domain, overrides) → PipelineResult` (§4.1). The sole
/// public entry point a host process calls to run the pipeline.
#[async_trait]
pub trait OrchestratorService: Send + Sync {
    async fn process(
        &self,
        text: &str,
        domain: Option<&str>,
        overrides: &HashMap<String, String>,
    ) -> Result<PipelineResult, EnrichmentError>;
}
