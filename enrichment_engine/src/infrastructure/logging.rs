//! Thin `tracing`/`tracing-subscriber` glue. Stage implementations
//! instrument their own spans and events directly via the `tracing` macros;
//! this module is just the process-wide subscriber wiring and a couple of
//! field-naming conventions shared across the engine (`request_id`,
//! `domain`, `stage`).

use tracing_subscriber::EnvFilter;

/// Output format for the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for local development.
    Pretty,
    /// Newline-delimited JSON, for log aggregation in deployment.
    Json,
}

/// Installs a global `tracing` subscriber honoring `RUST_LOG`, falling back
/// to `"info"` when unset or malformed. Idempotent-enough for tests: a
/// second call after one subscriber is already installed is a no-op rather
/// than a panic, since `tracing`'s global dispatcher can only be set once
/// per process.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match format {
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).try_init(),
    };

    if let Err(err) = result {
        eprintln!("tracing subscriber already installed, skipping: {err}");
    }
}

/// Field names every stage should use for the same concept, so log
/// aggregation queries don't have to account for `pipeline_id` vs
/// `request_id` drift between modules.
pub mod fields {
    pub const REQUEST_ID: &str = "request_id";
    pub const DOMAIN: &str = "domain";
    pub const STAGE: &str = "stage";
    pub const COMPONENT_ID: &str = "component_id";
}
