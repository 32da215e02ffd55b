use crate::entities::{EntityRecord, StageKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The final output of `Process(text, domain, overrides)`.
///
/// Always carries enough partial information to be rendered: `errors` and
/// `warnings` are plain lists, never a fatal field. A caller-facing failure
/// is only ever raised for `ConfigInvalid` or `NoModelsAvailable` before a
/// `PipelineResult` is even constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Ordered by `start` ascending, `end` descending, `type` lexicographic.
    pub entities: Vec<EntityRecord>,
    #[serde(with = "stage_timings_serde")]
    pub stage_timings: HashMap<StageKind, Duration>,
    pub components_used: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub cancelled: bool,
}

impl PipelineResult {
    pub fn empty() -> Self {
        PipelineResult::default()
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn push_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }

    pub fn record_component_used(&mut self, component_id: impl Into<String>) {
        let id = component_id.into();
        if !self.components_used.contains(&id) {
            self.components_used.push(id);
        }
    }

    pub fn record_stage_timing(&mut self, stage: StageKind, elapsed: Duration) {
        self.stage_timings.insert(stage, elapsed);
    }

    /// Invariant check used by tests and by the post-processing stage:
    /// every entity has at least one source and no two entities collapse to
    /// the same `(start, end, type)`.
    pub fn has_unique_entities(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.entities.iter().all(|entity| {
            !entity.source_ids.is_empty()
                && seen.insert((entity.span.start(), entity.span.end(), entity.entity_type.clone()))
        })
    }
}

/// `HashMap<StageKind, Duration>` cannot serialize directly to self-describing
/// formats (non-string keys); timings are exposed to hosts as nanoseconds
/// keyed by stage name.
mod stage_timings_serde {
    use super::*;
    use serde::de::Deserializer;
    use serde::ser::Serializer;

    pub fn serialize<S: Serializer>(
        map: &HashMap<StageKind, Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let as_strings: HashMap<String, u128> = map
            .iter()
            .map(|(stage, duration)| (stage_name(*stage).to_string(), duration.as_nanos()))
            .collect();
        as_strings.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<StageKind, Duration>, D::Error> {
        let as_strings: HashMap<String, u128> = HashMap::deserialize(deserializer)?;
        Ok(as_strings
            .into_iter()
            .filter_map(|(name, nanos)| stage_from_name(&name).map(|stage| (stage, Duration::from_nanos(nanos as u64))))
            .collect())
    }

    fn stage_name(stage: StageKind) -> &'static str {
        match stage {
            StageKind::Ner => "ner",
            StageKind::Enrichment => "enrichment",
            StageKind::Patterns => "patterns",
            StageKind::PostProcessing => "post_processing",
        }
    }

    fn stage_from_name(name: &str) -> Option<StageKind> {
        match name {
            "ner" => Some(StageKind::Ner),
            "enrichment" => Some(StageKind::Enrichment),
            "patterns" => Some(StageKind::Patterns),
            "post_processing" => Some(StageKind::PostProcessing),
            _ => None,
        }
    }
}
