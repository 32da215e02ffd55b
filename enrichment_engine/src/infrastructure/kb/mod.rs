//! KB enrichment stage (§4.3): fallback chains over the `KbProvider` port,
//! cached through the multi-tier cache.

mod cache_codec;
mod service;

pub use service::ChainEnrichmentStage;
