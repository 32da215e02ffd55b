//! Value objects: small, immutable, self-validating types threaded through
//! the pipeline in place of raw primitives.

mod char_span;
mod concurrency_cap;
mod confidence_score;
mod request_id;

pub use char_span::CharSpan;
pub use concurrency_cap::ConcurrencyCap;
pub use confidence_score::ConfidenceScore;
pub use request_id::RequestId;
