//! # Domain Error Taxonomy
//!
//! `EnrichmentError` enumerates every failure kind a stage or infrastructure
//! port can raise. Kinds, not exception types: the orchestrator decides how
//! to propagate each one (warning vs. fatal) purely from this enum, never
//! from `downcast` or string matching.
//!
//! ## Propagation policy
//!
//! Only [`EnrichmentError::ConfigInvalid`] and
//! [`EnrichmentError::NoModelsAvailable`] are fatal to a request. Every other
//! variant is captured locally by the stage that produced it and surfaced as
//! a warning on the final `PipelineResult`; [`EnrichmentError::is_recoverable`]
//! is the single source of truth for that split.

mod enrichment_error;

pub use enrichment_error::EnrichmentError;

/// Convenience alias used throughout the domain and engine crates.
pub type Result<T> = std::result::Result<T, EnrichmentError>;
