use crate::entities::{PipelineResult, StageKind};
use async_trait::async_trait;
use std::time::Duration;

/// Optional progress hooks invoked by the orchestrator around each stage.
/// Every method has an empty default body, matching the teacher's
/// `ProcessingObserver` pattern: implement only the hooks a given host
/// actually needs (CLI progress output, test invocation-order recorders).
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    async fn on_stage_started(&self, _stage: StageKind) {}

    async fn on_stage_completed(&self, _stage: StageKind, _elapsed: Duration, _entity_count: usize) {}

    async fn on_result(&self, _result: &PipelineResult) {}
}
