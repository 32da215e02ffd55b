use chrono::{DateTime, Utc};

/// Emitted by the self-optimizer around an A/B trial's lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub enum TrialLifecycleEvent {
    Started {
        experiment_id: String,
        control_id: String,
        treatment_id: String,
        traffic_split: f64,
        at: DateTime<Utc>,
    },
    Finalized {
        experiment_id: String,
        winner_id: String,
        significant: bool,
        at: DateTime<Utc>,
    },
}
