//! # Enrichment Engine
//!
//! The runtime half of the text-enrichment pipeline: concrete
//! infrastructure adapters for the ports declared in `enrichment-domain`,
//! and the application-layer orchestrator that drives them.
//!
//! ## Architecture
//!
//! - **`infrastructure`** — adapters implementing the domain's repository
//!   ports (NER ensemble, KB fallback chain, pattern matcher, hot-swap
//!   manager, trust validator, self-optimizer, multi-tier cache) plus the
//!   ambient concerns that sit beside them rather than behind a domain
//!   trait (config loading, logging, metrics).
//! - **`application`** — the `PipelineOrchestrator`, the single use case a
//!   host calls: `Process(text, domain, overrides) -> PipelineResult`.
//! - **`testing`** — fake implementations of every port, used by this
//!   crate's own tests and by the integration tests under `tests/`.
//!
//! A host process (the `enrichment-bootstrap` CLI, or any other caller)
//! wires a `PipelineOrchestrator` together from the infrastructure types
//! exported here, loads a `PipelineConfig` through a `ConfigLoader`, and
//! calls `OrchestratorService::process` once per request.

pub mod application;
pub mod infrastructure;
pub mod testing;

pub use application::PipelineOrchestrator;
pub use enrichment_domain::error::EnrichmentError;
pub use enrichment_domain::services::OrchestratorService;
