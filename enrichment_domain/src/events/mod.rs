//! Domain events: notable state transitions a host may want to observe
//! (metrics, audit logs) without coupling the domain to any particular
//! sink.

mod component_events;
mod trial_events;

pub use component_events::ComponentLifecycleEvent;
pub use trial_events::TrialLifecycleEvent;
