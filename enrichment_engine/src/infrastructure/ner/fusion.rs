//! Majority-vote fusion with agreement boost (§4.2 step 4).

use enrichment_domain::entities::{EntityRecord, SourceStage};
use enrichment_domain::repositories::NerHit;
use enrichment_domain::value_objects::{CharSpan, ConfidenceScore};
use std::collections::HashMap;

struct Vote {
    model_id: String,
    entity_type: String,
    text: String,
    confidence: f64,
}

/// Fuses one model's hits, keyed by model id, into entities.
///
/// `ensemble_size` is the number of models that actually ran (i.e. were not
/// cancelled by a per-model timeout), since the agreement boost and quorum
/// check are both defined relative to the models that contributed, not the
/// models that were merely selected.
pub fn fuse(
    per_model_hits: Vec<(String, Vec<NerHit>)>,
    ensemble_size: usize,
    min_votes: usize,
    min_models_for_quorum: usize,
    min_confidence: ConfidenceScore,
) -> Vec<EntityRecord> {
    let mut groups: HashMap<(usize, usize), Vec<Vote>> = HashMap::new();
    for (model_id, hits) in per_model_hits {
        for hit in hits {
            groups.entry((hit.start, hit.end)).or_default().push(Vote {
                model_id: model_id.clone(),
                entity_type: hit.entity_type,
                text: hit.text,
                confidence: hit.confidence,
            });
        }
    }

    let mut entities = Vec::new();
    for ((start, end), votes) in groups {
        if votes.is_empty() {
            continue;
        }

        if ensemble_size >= min_models_for_quorum && votes.len() < min_votes {
            continue;
        }

        let mut by_type: HashMap<String, Vec<&Vote>> = HashMap::new();
        for vote in &votes {
            by_type.entry(vote.entity_type.clone()).or_default().push(vote);
        }

        let winning_type = by_type
            .iter()
            .max_by(|a, b| {
                a.1.len()
                    .cmp(&b.1.len())
                    .then_with(|| {
                        let sum_a: f64 = a.1.iter().map(|v| v.confidence).sum();
                        let sum_b: f64 = b.1.iter().map(|v| v.confidence).sum();
                        sum_a.partial_cmp(&sum_b).unwrap_or(std::cmp::Ordering::Equal)
                    })
                    .then_with(|| b.0.cmp(a.0))
            })
            .map(|(entity_type, _)| entity_type.clone())
            .expect("at least one vote present");

        let winning_votes = &by_type[&winning_type];
        let mean_confidence: f64 =
            winning_votes.iter().map(|v| v.confidence).sum::<f64>() / winning_votes.len() as f64;
        let agreement_boost = 0.10 * winning_votes.len() as f64 / ensemble_size.max(1) as f64;
        let fused_confidence = ConfidenceScore::new((mean_confidence + agreement_boost).min(1.0));

        if fused_confidence.value() < min_confidence.value() {
            continue;
        }

        let Some(span) = CharSpan::new(start, end) else {
            continue;
        };

        let text = winning_votes[0].text.clone();
        let mut entity = EntityRecord::new(
            text,
            winning_type,
            span,
            fused_confidence,
            SourceStage::Ner,
            winning_votes[0].model_id.clone(),
        );
        for vote in &votes {
            entity
                .source_ids
                .insert(vote.model_id.clone(), ConfidenceScore::new(vote.confidence));
        }
        entities.push(entity);
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(text: &str, entity_type: &str, start: usize, end: usize, confidence: f64) -> NerHit {
        NerHit { text: text.into(), entity_type: entity_type.into(), start, end, confidence }
    }

    #[test]
    fn agreeing_models_boost_confidence_above_either_alone() {
        let per_model = vec![
            ("model-a".to_string(), vec![hit("Aspirin", "DRUG", 0, 7, 0.8)]),
            ("model-b".to_string(), vec![hit("Aspirin", "DRUG", 0, 7, 0.75)]),
        ];
        let entities = fuse(per_model, 2, 1, 2, ConfidenceScore::new(0.0));
        assert_eq!(entities.len(), 1);
        assert!(entities[0].confidence.value() > 0.775);
        assert_eq!(entities[0].source_ids.len(), 2);
    }

    #[test]
    fn disagreement_on_type_resolves_by_vote_count_then_confidence() {
        let per_model = vec![
            ("model-a".to_string(), vec![hit("Tylenol", "DRUG", 0, 7, 0.6)]),
            ("model-b".to_string(), vec![hit("Tylenol", "BRAND", 0, 7, 0.9)]),
            ("model-c".to_string(), vec![hit("Tylenol", "DRUG", 0, 7, 0.5)]),
        ];
        let entities = fuse(per_model, 3, 1, 2, ConfidenceScore::new(0.0));
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_type, "DRUG");
    }

    #[test]
    fn quorum_drops_single_vote_groups_when_ensemble_large_enough() {
        let per_model = vec![
            ("model-a".to_string(), vec![hit("X", "MISC", 0, 1, 0.9)]),
            ("model-b".to_string(), vec![]),
        ];
        let entities = fuse(per_model, 2, 2, 2, ConfidenceScore::new(0.0));
        assert!(entities.is_empty());
    }

    #[test]
    fn min_confidence_filters_out_weak_fused_entities() {
        let per_model = vec![("model-a".to_string(), vec![hit("X", "MISC", 0, 1, 0.2)])];
        let entities = fuse(per_model, 1, 1, 2, ConfidenceScore::new(0.7));
        assert!(entities.is_empty());
    }
}
