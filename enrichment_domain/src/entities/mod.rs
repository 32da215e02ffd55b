//! Entities: the mutable, identity-bearing records the pipeline creates,
//! transitions, and retires over the lifetime of a request or a component
//! registration.

mod component_descriptor;
mod component_slot;
mod entity_record;
mod performance_sample;
mod pipeline_config;
mod pipeline_result;

pub use component_descriptor::{ComponentDescriptor, ComponentKind, TrustLevel};
pub use component_slot::{ComponentSlot, SlotState};
pub use entity_record::{EntityRecord, SourceStage};
pub use performance_sample::PerformanceSample;
pub use pipeline_config::{
    EnrichmentConfig, NerConfig, OptimizerConfig, OptimizerStrategy, PatternConfig,
    PipelineConfig, PostProcessingConfig, StageFractions, StageKind, TrustPolicy,
};
pub use pipeline_result::PipelineResult;
