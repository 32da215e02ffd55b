//! NER ensemble stage (§4.2): selection scoring, concurrent fan-out through
//! the hot-swap registry, and majority-vote fusion.

mod fusion;
mod selection;
mod service;

pub use service::EnsembleNerStage;
