//! # Bootstrap Module
//!
//! Sits outside the domain/application/infrastructure layers of
//! `enrichment_engine` and provides everything a process needs before the
//! pipeline itself runs:
//!
//! - **Argument parsing** - secure CLI validation (`cli`)
//! - **Bootstrap logging** - reporting failures before a `tracing`
//!   subscriber is installed (`logger`)
//! - **Shutdown coordination** - grace-period-bounded cancellation shared
//!   with in-flight pipeline requests and hot-swap slot draining
//!   (`shutdown`)
//!
//! ## Module Structure
//!
//! - `cli` - secure argument parsing
//! - `logger` - bootstrap-specific logging
//! - `shutdown` - shutdown coordination

pub mod cli;
pub mod logger;
pub mod shutdown;

pub use cli::{ValidatedCli, ValidatedCommand};
pub use logger::{BootstrapLogger, ConsoleLogger, NoOpLogger};
pub use shutdown::{CancellationToken, ShutdownCoordinator};

/// Parses and validates CLI arguments. The main entry point for the
/// bootstrap layer; the caller runs the application logic and maps the
/// result to a process exit code.
pub fn bootstrap_cli() -> Result<ValidatedCli, cli::ParseError> {
    cli::parse_and_validate()
}
