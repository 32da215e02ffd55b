use crate::entities::ComponentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed invocation of one component. Immutable once written;
/// appended to a ring buffer per `(kind, component_id, domain)` and dropped
/// once it ages out of the configured window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub component_id: String,
    pub kind: ComponentKind,
    pub domain: Option<String>,
    pub latency_ms: f64,
    pub throughput_eps: f64,
    /// Agreement with the ensemble majority (NER), or validated-fraction
    /// (patterns); a proxy for accuracy, not ground truth.
    pub accuracy_proxy: f64,
    pub error: bool,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceSample {
    pub fn cohort_key(&self) -> (ComponentKind, String, Option<String>) {
        (self.kind, self.component_id.clone(), self.domain.clone())
    }
}
