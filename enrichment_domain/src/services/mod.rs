//! Domain services: the behavior-bearing traits stage implementations and
//! the orchestrator are built against. Concrete implementations live in the
//! engine crate; this module only fixes the contracts.

mod hot_swap;
mod observer;
mod optimizer;
mod orchestrator;
mod stage;
mod trust;

pub use hot_swap::{ComponentLease, HotSwapManager, ReleaseHandle};
pub use observer::PipelineObserver;
pub use optimizer::{Recommendation, SelfOptimizer, TrialOutcome};
pub use orchestrator::OrchestratorService;
pub use stage::{EnrichmentStageService, NerStageService, PatternStageService};
pub use trust::TrustValidator;
