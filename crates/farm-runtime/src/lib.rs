//! farm-runtime: container runtime adapter for terminal units.
//!
//! The reconciliation engine talks to the runtime exclusively through
//! the [`ContainerRuntime`] trait, keyed by logical terminal id. The
//! Docker implementation lives in [`docker`]; an in-memory
//! [`mock::MockRuntime`] backs the engine tests.
//!
//! Failure policy: operations resolve to `Ok(true)` / `Ok(false)` so
//! the engine can count outcomes without caring about transport
//! details. The error side of [`RuntimeResult`] exists for
//! implementations that want to surface failures distinctly; the
//! engine treats it the same as `Ok(false)`.

pub mod docker;
pub mod error;
pub mod mock;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;

use farm_core::{TerminalId, TerminalSpec};

pub use docker::DockerRuntime;
pub use error::{RuntimeError, RuntimeResult};
pub use mock::MockRuntime;

/// Naming convention tying a container back to its terminal id.
pub const CONTAINER_PREFIX: &str = "mt5-terminal-";

/// Container name for a terminal id.
pub fn container_name(id: &str) -> String {
    format!("{CONTAINER_PREFIX}{id}")
}

/// Terminal id for a container name, if it follows the convention.
pub fn terminal_id(container_name: &str) -> Option<&str> {
    container_name.strip_prefix(CONTAINER_PREFIX)
}

/// Observed lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
}

impl ContainerStatus {
    /// States a plain `start` can recover from. Anything else is
    /// removed and recreated.
    pub fn is_restartable(self) -> bool {
        matches!(self, Self::Created | Self::Exited)
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Lifecycle operations the reconciliation engine needs, all
/// idempotent with respect to the logical terminal id.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ids of terminals whose container currently reports `running`.
    ///
    /// Degrades to the empty set if the runtime cannot be queried; the
    /// engine then sees every desired-running terminal as missing.
    async fn list_running_ids(&self) -> HashSet<TerminalId>;

    /// Ensure a container for this spec exists and is running.
    ///
    /// Returns `Ok(true)` only if the container ends the call running.
    /// Incomplete credentials fail locally with `Ok(false)` before any
    /// runtime contact.
    async fn create_or_restart(&self, spec: &TerminalSpec) -> RuntimeResult<bool>;

    /// Stop (bounded grace) and remove the terminal's container.
    ///
    /// An absent container is success: the goal state is "not
    /// running", and it already isn't.
    async fn stop_and_remove(&self, id: &str) -> RuntimeResult<bool>;

    /// Point status lookup. Not used by the reconciliation algorithm.
    async fn status(&self, id: &str) -> RuntimeResult<Option<ContainerStatus>>;
}
