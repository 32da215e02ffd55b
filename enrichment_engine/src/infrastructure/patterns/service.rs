//! Pattern stage (§4.4): a built-in regex `PatternMatcher`, plus the
//! `PatternStageService` that turns its raw hits into `EntityRecord`s by
//! applying context-sensitive confidence adjustment, validation, and
//! normalization, then resolving overlaps among same-pass matches.

use super::tables::{PatternDescriptor, PATTERNS};
use async_trait::async_trait;
use enrichment_domain::entities::{EntityRecord, PipelineConfig, SourceStage};
use enrichment_domain::error::EnrichmentError;
use enrichment_domain::repositories::{PatternHit, PatternMatcher};
use enrichment_domain::services::PatternStageService;
use enrichment_domain::value_objects::{CharSpan, ConfidenceScore};

const CONTEXT_WINDOW: usize = 40;
const SUPPORT_BOOST: f64 = 0.15;
const NEGATE_PENALTY: f64 = 0.2;
const VALIDATION_PENALTY: f64 = 0.2;

/// The reference structured-pattern matcher, built from the static
/// `PATTERNS` table. Pure and synchronous per the `PatternMatcher` port.
pub struct BuiltinPatternMatcher;

impl PatternMatcher for BuiltinPatternMatcher {
    fn find_matches(&self, text: &str) -> Vec<PatternHit> {
        let mut hits = Vec::new();
        for descriptor in PATTERNS.iter() {
            for m in descriptor.regex.find_iter(text) {
                hits.push(PatternHit {
                    pattern_id: descriptor.id.to_string(),
                    text: m.as_str().to_string(),
                    start: m.start(),
                    end: m.end(),
                    base_confidence: descriptor.base_confidence,
                });
            }
        }
        hits
    }
}

fn descriptor_for(pattern_id: &str) -> Option<&'static PatternDescriptor> {
    PATTERNS.iter().find(|p| p.id == pattern_id)
}

fn context_window(text: &str, start: usize, end: usize) -> String {
    let before = text[..start.min(text.len())].chars().rev().take(CONTEXT_WINDOW).collect::<Vec<_>>();
    let before: String = before.into_iter().rev().collect();
    let after: String = text[end.min(text.len())..].chars().take(CONTEXT_WINDOW).collect();
    format!("{before} {after}").to_lowercase()
}

fn adjust_confidence(base: f64, descriptor: &PatternDescriptor, context: &str) -> f64 {
    let mut confidence = base;
    if descriptor.supporting_keywords.iter().any(|kw| context.contains(kw)) {
        confidence += SUPPORT_BOOST;
    }
    if descriptor.negating_keywords.iter().any(|kw| context.contains(kw)) {
        confidence -= NEGATE_PENALTY;
    }
    confidence.clamp(0.0, 1.0)
}

type PatternCandidate = (PatternHit, &'static PatternDescriptor, f64, bool);

/// Among matches that overlap in span: higher confidence wins; ties broken
/// by the longer span, then by higher declared priority (§4.4's overlap
/// rule). Non-overlapping matches are all kept regardless of type.
fn resolve_overlaps(mut candidates: Vec<PatternCandidate>) -> Vec<PatternCandidate> {
    fn span_len(candidate: &PatternCandidate) -> usize {
        candidate.0.end - candidate.0.start
    }
    fn beats(candidate: &PatternCandidate, existing: &PatternCandidate) -> bool {
        candidate
            .2
            .partial_cmp(&existing.2)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(span_len(candidate).cmp(&span_len(existing)))
            .then(candidate.1.priority.cmp(&existing.1.priority))
            .is_gt()
    }

    candidates.sort_by(|a, b| {
        a.0.start
            .cmp(&b.0.start)
            .then(b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal))
            .then(span_len(b).cmp(&span_len(a)))
            .then(b.1.priority.cmp(&a.1.priority))
    });

    let mut kept: Vec<PatternCandidate> = Vec::new();
    'outer: for candidate in candidates {
        for existing in &kept {
            let overlaps = candidate.0.start < existing.0.end && existing.0.start < candidate.0.end;
            if overlaps && !beats(&candidate, existing) {
                continue 'outer;
            }
        }
        kept.retain(|existing| !(candidate.0.start < existing.0.end && existing.0.start < candidate.0.end));
        kept.push(candidate);
    }
    kept
}

pub struct RegexPatternStage<M: PatternMatcher> {
    matcher: M,
}

impl<M: PatternMatcher> RegexPatternStage<M> {
    pub fn new(matcher: M) -> Self {
        RegexPatternStage { matcher }
    }
}

impl Default for RegexPatternStage<BuiltinPatternMatcher> {
    fn default() -> Self {
        RegexPatternStage::new(BuiltinPatternMatcher)
    }
}

#[async_trait]
impl<M: PatternMatcher> PatternStageService for RegexPatternStage<M> {
    async fn match_patterns(
        &self,
        text: &str,
        _domain: Option<&str>,
        config: &PipelineConfig,
    ) -> Result<Vec<EntityRecord>, EnrichmentError> {
        let raw_hits = self.matcher.find_matches(text);

        let mut candidates = Vec::new();
        for hit in raw_hits {
            let Some(descriptor) = descriptor_for(&hit.pattern_id) else {
                continue;
            };
            let context = context_window(text, hit.start, hit.end);
            let mut confidence = adjust_confidence(hit.base_confidence, descriptor, &context);
            // A validation failure never discards the candidate; it's kept
            // with `validated = false` and a flat confidence penalty (§4.4
            // step 3), so a malformed-but-plausible code still surfaces for
            // a caller to judge rather than silently vanishing.
            let validated = (descriptor.validate)(&hit.text);
            if !validated {
                confidence = (confidence - VALIDATION_PENALTY).clamp(0.0, 1.0);
            }
            if confidence < config.patterns.min_confidence.value() {
                continue;
            }
            candidates.push((hit, descriptor, confidence, validated));
        }

        let resolved = resolve_overlaps(candidates);

        let mut entities = Vec::with_capacity(resolved.len());
        for (hit, descriptor, confidence, validated) in resolved {
            let Some(span) = CharSpan::new(hit.start, hit.end) else {
                continue;
            };
            let mut entity = EntityRecord::new(
                hit.text.clone(),
                descriptor.entity_type,
                span,
                ConfidenceScore::new(confidence),
                SourceStage::Pattern,
                descriptor.id,
            );
            entity.normalized_text = Some((descriptor.normalize)(&hit.text));
            entity.validated = validated;
            entities.push(entity);
        }

        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrichment_domain::entities::PipelineConfig;

    #[tokio::test]
    async fn finds_icd_code_with_supporting_context() {
        let stage = RegexPatternStage::default();
        let config = PipelineConfig::default();
        let entities = stage
            .match_patterns("Primary diagnosis: E11.9 confirmed.", None, &config)
            .await
            .unwrap();
        assert!(entities.iter().any(|e| e.entity_type == "ICD_CODE" && e.text == "E11.9"));
        let icd = entities.iter().find(|e| e.entity_type == "ICD_CODE").unwrap();
        assert!(icd.confidence.value() > 0.8);
    }

    #[tokio::test]
    async fn overlapping_route_and_cpt_keep_higher_priority() {
        let stage = RegexPatternStage::default();
        let config = PipelineConfig::default();
        let entities = stage.match_patterns("Administer 500 mg PO daily.", None, &config).await.unwrap();
        assert!(entities.iter().any(|e| e.entity_type == "DOSAGE"));
        assert!(entities.iter().any(|e| e.entity_type == "ROUTE"));
    }

    #[tokio::test]
    async fn usc_citation_is_normalized() {
        let stage = RegexPatternStage::default();
        let config = PipelineConfig::default();
        let entities = stage
            .match_patterns("Violation of 42 USC 1983 alleged under this title.", None, &config)
            .await
            .unwrap();
        let citation = entities.iter().find(|e| e.entity_type == "USC_CITATION").unwrap();
        assert_eq!(citation.normalized_text.as_deref(), Some("42 U.S.C. § 1983"));
    }

    #[tokio::test]
    async fn failed_validation_is_kept_unvalidated_with_reduced_confidence() {
        let stage = RegexPatternStage::default();
        let config = PipelineConfig::default();
        // "01234" matches the 5-digit CPT regex but fails `validate_cpt`
        // (leading zero); it must survive with validated=false rather than
        // being dropped.
        let entities = stage.match_patterns("Procedure code 01234 billed.", None, &config).await.unwrap();
        let cpt = entities.iter().find(|e| e.entity_type == "CPT_CODE").expect("cpt candidate retained");
        assert!(!cpt.validated);
        assert!((cpt.confidence.value() - (0.6 + SUPPORT_BOOST - VALIDATION_PENALTY)).abs() < 1e-9);
    }

    #[tokio::test]
    async fn negating_context_can_drop_below_min_confidence() {
        let stage = RegexPatternStage::default();
        let mut config = PipelineConfig::default();
        config.patterns.min_confidence = ConfidenceScore::new(0.7);
        let entities = stage
            .match_patterns("Take highway exit near E11.9 street marker.", None, &config)
            .await
            .unwrap();
        assert!(!entities.iter().any(|e| e.entity_type == "ICD_CODE"));
    }
}
