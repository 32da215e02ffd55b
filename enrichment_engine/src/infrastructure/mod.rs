//! Infrastructure layer: adapters implementing the domain's repository
//! ports, plus the ambient concerns (config, logging, metrics) that sit
//! beside them rather than behind a domain trait.

pub mod cache;
pub mod config;
pub mod hotswap;
pub mod kb;
pub mod logging;
pub mod metrics;
pub mod ner;
pub mod optimizer;
pub mod patterns;
pub mod trust;

pub use cache::{CacheHitTier, MultiTierCache, Tier1Cache};
pub use config::TomlConfigLoader;
pub use hotswap::InMemoryHotSwapManager;
pub use kb::ChainEnrichmentStage;
pub use logging::{init_tracing, LogFormat};
pub use metrics::MetricsService;
pub use ner::EnsembleNerStage;
pub use optimizer::InMemorySelfOptimizer;
pub use patterns::{BuiltinPatternMatcher, RegexPatternStage};
pub use trust::PolicyTrustValidator;
