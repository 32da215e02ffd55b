use crate::value_objects::{CharSpan, ConfidenceScore};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which stage produced (or last touched) an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceStage {
    Ner,
    Pattern,
    Enriched,
}

/// The unit flowing between pipeline stages.
///
/// Created by the NER or pattern stage, mutated in place by enrichment
/// (which only ever adds KB fields and only ever raises `confidence`) and by
/// post-processing (which may merge two records into one). Offsets are
/// always into the original request text, never into a normalized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub text: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub span: CharSpan,
    pub confidence: ConfidenceScore,
    pub source_stage: SourceStage,
    /// Producing component id -> that component's own confidence for this
    /// span. Never empty: every entity has at least one source.
    pub source_ids: HashMap<String, ConfidenceScore>,
    pub normalized_text: Option<String>,
    pub kb_id: Option<String>,
    pub kb_entity_id: Option<String>,
    pub canonical_name: Option<String>,
    pub definition: Option<String>,
    pub semantic_types: std::collections::HashSet<String>,
    pub relationships: HashMap<String, Vec<String>>,
    pub validated: bool,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl EntityRecord {
    /// Builds a bare entity as a NER or pattern stage would emit it, before
    /// enrichment or post-processing touch it.
    pub fn new(
        text: impl Into<String>,
        entity_type: impl Into<String>,
        span: CharSpan,
        confidence: ConfidenceScore,
        source_stage: SourceStage,
        source_component_id: impl Into<String>,
    ) -> Self {
        let mut source_ids = HashMap::new();
        source_ids.insert(source_component_id.into(), confidence);
        EntityRecord {
            text: text.into(),
            entity_type: entity_type.into(),
            span,
            confidence,
            source_stage,
            source_ids,
            normalized_text: None,
            kb_id: None,
            kb_entity_id: None,
            canonical_name: None,
            definition: None,
            semantic_types: std::collections::HashSet::new(),
            relationships: HashMap::new(),
            validated: false,
            metadata: HashMap::new(),
        }
    }

    /// The identity key used to match a decorated entity back to the
    /// original across interface boundaries that may copy it, per §4.3:
    /// `(start, end, lowercased text, type)`, never a runtime identifier.
    pub fn identity_key(&self) -> (usize, usize, String, String) {
        (
            self.span.start(),
            self.span.end(),
            self.text.to_lowercase(),
            self.entity_type.clone(),
        )
    }

    pub fn is_kb_linked(&self) -> bool {
        self.kb_id.is_some()
    }

    /// Applies an enrichment result. Confidence only ever increases here,
    /// upholding the monotone-enrichment invariant; callers must pass a
    /// `new_confidence` that is already `>= self.confidence`.
    pub fn apply_enrichment(
        &mut self,
        kb_id: impl Into<String>,
        kb_entity_id: Option<String>,
        canonical_name: Option<String>,
        definition: Option<String>,
        semantic_types: std::collections::HashSet<String>,
        relationships: HashMap<String, Vec<String>>,
        new_confidence: ConfidenceScore,
    ) {
        debug_assert!(new_confidence.value() >= self.confidence.value());
        self.kb_id = Some(kb_id.into());
        self.kb_entity_id = kb_entity_id;
        self.canonical_name = canonical_name;
        self.definition = definition;
        self.semantic_types = semantic_types;
        self.relationships = relationships;
        self.confidence = ConfidenceScore::new(new_confidence.value().max(self.confidence.value()));
        self.source_stage = SourceStage::Enriched;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> CharSpan {
        CharSpan::new(start, end).unwrap()
    }

    #[test]
    fn new_entity_has_exactly_one_source() {
        let entity = EntityRecord::new(
            "Lisinopril",
            "DRUG",
            span(19, 29),
            ConfidenceScore::new(0.92),
            SourceStage::Ner,
            "model-a",
        );
        assert_eq!(entity.source_ids.len(), 1);
        assert!(entity.source_ids.contains_key("model-a"));
        assert!(!entity.is_kb_linked());
    }

    #[test]
    fn identity_key_lowercases_text_and_ignores_runtime_identity() {
        let a = EntityRecord::new(
            "Aspirin",
            "DRUG",
            span(0, 7),
            ConfidenceScore::new(0.8),
            SourceStage::Ner,
            "model-a",
        );
        let mut b = a.clone();
        b.text = "ASPIRIN".into();
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn enrichment_never_lowers_confidence() {
        let mut entity = EntityRecord::new(
            "Morphine",
            "DRUG",
            span(0, 8),
            ConfidenceScore::new(0.9),
            SourceStage::Ner,
            "model-a",
        );
        entity.apply_enrichment(
            "rxnorm",
            Some("rx-123".into()),
            Some("Morphine".into()),
            None,
            std::collections::HashSet::new(),
            HashMap::new(),
            ConfidenceScore::new(0.5),
        );
        assert!(entity.confidence.value() >= 0.9);
        assert_eq!(entity.source_stage, SourceStage::Enriched);
    }
}
