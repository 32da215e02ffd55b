/// A raw pattern match, before context-adjustment, validation, and
/// normalization (those are applied by the pattern stage, not the matcher
/// itself, since §4.4 describes them as pipeline steps over the matcher's
/// candidates).
#[derive(Debug, Clone, PartialEq)]
pub struct PatternHit {
    pub pattern_id: String,
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub base_confidence: f64,
}

/// Port for a structured-pattern matcher. Pure and synchronous — no I/O, per
/// §6 — unlike the other two extractor ports.
pub trait PatternMatcher: Send + Sync {
    fn find_matches(&self, text: &str) -> Vec<PatternHit>;
}
