//! Domain types for the terminal farm.

use serde::{Deserialize, Serialize};

/// Logical identifier of a terminal, as assigned by the control plane.
///
/// This is the identity everything is keyed on; Docker's internal
/// container ids never leave the runtime adapter.
pub type TerminalId = String;

/// Desired lifecycle state of a terminal, as published by the
/// control plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DesiredStatus {
    /// The control plane omits the field for legacy entries; those
    /// default to running.
    #[default]
    Running,
    Stopped,
}

/// One entry of the desired-state list.
///
/// Immutable for the duration of a reconciliation pass. Unknown fields
/// in the control-plane payload are ignored; credential fields default
/// to empty strings and are validated only when a container actually
/// has to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSpec {
    pub id: TerminalId,
    #[serde(default)]
    pub status: DesiredStatus,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub password: String,
}

impl TerminalSpec {
    /// Names of the credential fields that are empty but required for
    /// a running terminal.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.server.is_empty() {
            missing.push("server");
        }
        if self.login.is_empty() {
            missing.push("login");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}

/// Outcome counters for one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileStats {
    /// Containers created (or restarted) this pass.
    pub created: u32,
    /// Containers stopped and removed this pass.
    pub stopped: u32,
    /// Reserved. The convergence logic never updates a container in
    /// place; it stops and recreates instead.
    pub updated: u32,
    /// Per-item failures. Each failed create or stop counts once; the
    /// rest of the plan still runs.
    pub errors: u32,
}

impl ReconcileStats {
    /// True when the pass completed without any per-item failure.
    pub fn is_clean(&self) -> bool {
        self.errors == 0
    }
}
