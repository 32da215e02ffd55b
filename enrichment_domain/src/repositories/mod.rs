//! Repository ports: the abstract collaborators the engine consumes
//! (§6). Each trait here describes a capability, not a wire protocol — the
//! engine is agnostic to whether an implementation calls out over HTTP, gRPC,
//! or an in-process stub.

mod cache_tier;
mod clock;
mod config_loader;
mod kb_provider;
mod ner_model;
mod pattern_matcher;

pub use cache_tier::{CacheTier, CacheValue};
pub use clock::Clock;
pub use config_loader::ConfigLoader;
pub use kb_provider::{KbLookupResult, KbProvider};
pub use ner_model::{NerHit, NerModel};
pub use pattern_matcher::{PatternHit, PatternMatcher};
