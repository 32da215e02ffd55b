use enrichment_domain::repositories::{PatternHit, PatternMatcher};

/// Returns a fixed list of hits regardless of input, for tests that want to
/// control pattern-stage input without depending on the built-in regex
/// table.
pub struct FakePatternMatcher {
    hits: Vec<PatternHit>,
}

impl FakePatternMatcher {
    pub fn new(hits: Vec<PatternHit>) -> Self {
        FakePatternMatcher { hits }
    }
}

impl PatternMatcher for FakePatternMatcher {
    fn find_matches(&self, _text: &str) -> Vec<PatternHit> {
        self.hits.clone()
    }
}
