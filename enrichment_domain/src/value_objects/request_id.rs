use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Identifies a single pipeline request. Used as the `tracing` `request_id`
/// field and as the deterministic-bucketing key for A/B trial assignment
/// (§4.7): the same request always buckets to the same trial arm for the
/// lifetime of the trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Ulid);

impl RequestId {
    pub fn new() -> Self {
        RequestId(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        RequestId(ulid)
    }

    /// Deterministic `[0, 1)` bucket position derived from the id, used to
    /// decide A/B trial membership against a `traffic_split` fraction
    /// without any shared mutable counter.
    pub fn bucket_fraction(self) -> f64 {
        let bytes = self.0.to_bytes();
        let mut acc: u64 = 0;
        for byte in &bytes[..8] {
            acc = (acc << 8) | *byte as u64;
        }
        (acc as f64) / (u64::MAX as f64)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_fraction_is_stable_for_same_id() {
        let id = RequestId::new();
        assert_eq!(id.bucket_fraction(), id.bucket_fraction());
    }

    #[test]
    fn bucket_fraction_is_within_unit_interval() {
        for _ in 0..100 {
            let frac = RequestId::new().bucket_fraction();
            assert!((0.0..1.0).contains(&frac));
        }
    }
}
