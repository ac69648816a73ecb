//! farm-core: shared domain types and configuration for the terminal
//! farm orchestrator.
//!
//! Everything here is consumed by the API client, the runtime adapter,
//! and the reconciliation engine. The types are deliberately plain:
//! the orchestrator is stateless across invocations, so nothing in
//! this crate is ever persisted.

pub mod config;
pub mod types;

pub use config::{ConfigError, OrchestratorConfig};
pub use types::{DesiredStatus, ReconcileStats, TerminalId, TerminalSpec};
