//! # Enrichment Domain
//!
//! Pure, reusable business logic for the text-enrichment pipeline: entities,
//! value objects, domain services (trait ports), domain events, and the
//! error taxonomy. Following DDD principles:
//!
//! - **Entities** have identity and a lifecycle (`ComponentSlot` transitions
//!   through its hot-swap state machine; `EntityRecord` is created, then
//!   mutated by enrichment and post-processing).
//! - **Value objects** are immutable and compared by value
//!   (`ConfidenceScore`, `CharSpan`, `ConcurrencyCap`).
//! - **Domain services** express behavior that does not belong to any single
//!   entity (`OrchestratorService`, `HotSwapManager`, `TrustValidator`,
//!   `SelfOptimizer`).
//! - **Repositories** here are ports onto external collaborators — NER
//!   models, KB providers, pattern matchers, cache tiers — not onto a
//!   database; this crate has no persistence concern of its own.
//! - **Domain events** record notable transitions for a host's
//!   observability layer without coupling this crate to one.
//!
//! This crate depends on nothing that requires a runtime: no `tokio`, no
//! `tracing`. Traits that are inherently I/O-bound (`NerModel`, `KbProvider`,
//! `CacheTier`) are still declared `async` here because the async-ness is a
//! property of the port's contract, not of any infrastructure choice — the
//! engine crate is what actually drives a runtime.

pub mod entities;
pub mod error;
pub mod events;
pub mod repositories;
pub mod services;
pub mod value_objects;

pub use entities::{
    ComponentDescriptor, ComponentKind, ComponentSlot, EntityRecord, PerformanceSample,
    PipelineConfig, PipelineResult, SlotState, SourceStage, TrustLevel,
};
pub use error::EnrichmentError;
pub use value_objects::{CharSpan, ConcurrencyCap, ConfidenceScore, RequestId};
