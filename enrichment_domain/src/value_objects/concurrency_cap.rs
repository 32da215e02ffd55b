use serde::{Deserialize, Serialize};

/// A clamped concurrency bound used for semaphore capacities (KB enrichment
/// in-flight calls, NER ensemble fan-out) so that a misconfigured value of
/// zero can never construct a permanently-blocking semaphore.
///
/// Grounded on the same clamp-in-constructor idiom as the teacher's worker
/// count value object, narrowed to this crate's actual range needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyCap(usize);

impl ConcurrencyCap {
    pub const MIN: usize = 1;
    pub const MAX: usize = 256;
    pub const DEFAULT_KB_ENRICHMENT: usize = 10;

    pub fn new(requested: usize) -> Self {
        ConcurrencyCap(requested.clamp(Self::MIN, Self::MAX))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for ConcurrencyCap {
    fn default() -> Self {
        ConcurrencyCap::new(Self::DEFAULT_KB_ENRICHMENT)
    }
}

impl From<usize> for ConcurrencyCap {
    fn from(value: usize) -> Self {
        ConcurrencyCap::new(value)
    }
}

impl From<ConcurrencyCap> for usize {
    fn from(cap: ConcurrencyCap) -> Self {
        cap.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_clamps_to_minimum() {
        assert_eq!(ConcurrencyCap::new(0).get(), ConcurrencyCap::MIN);
    }

    #[test]
    fn oversized_clamps_to_maximum() {
        assert_eq!(ConcurrencyCap::new(10_000).get(), ConcurrencyCap::MAX);
    }

    #[test]
    fn default_matches_kb_enrichment_default() {
        assert_eq!(ConcurrencyCap::default().get(), 10);
    }
}
