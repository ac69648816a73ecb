//! In-memory runtime for engine tests.
//!
//! Mirrors the adapter contract: credential validation happens before
//! any "runtime" interaction, stopping an absent terminal succeeds,
//! and failures can be injected per terminal id either as `Ok(false)`
//! results or as hard errors.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use farm_core::{TerminalId, TerminalSpec};

use crate::error::{RuntimeError, RuntimeResult};
use crate::{ContainerRuntime, ContainerStatus};

#[derive(Debug, Default)]
struct MockState {
    running: HashSet<TerminalId>,
    fail_create: HashSet<TerminalId>,
    fail_stop: HashSet<TerminalId>,
    error_on: HashSet<TerminalId>,
    created: Vec<TerminalId>,
    stopped: Vec<TerminalId>,
}

/// In-memory [`ContainerRuntime`] that records every call.
#[derive(Debug, Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set of currently running terminals.
    pub fn with_running<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TerminalId>,
    {
        let runtime = Self::new();
        runtime.lock().running = ids.into_iter().map(Into::into).collect();
        runtime
    }

    /// Make `create_or_restart` return `Ok(false)` for this id.
    pub fn failing_create(self, id: &str) -> Self {
        self.lock().fail_create.insert(id.to_string());
        self
    }

    /// Make `stop_and_remove` return `Ok(false)` for this id.
    pub fn failing_stop(self, id: &str) -> Self {
        self.lock().fail_stop.insert(id.to_string());
        self
    }

    /// Make any operation on this id return a hard error.
    pub fn erroring(self, id: &str) -> Self {
        self.lock().error_on.insert(id.to_string());
        self
    }

    /// Ids successfully created, in call order.
    pub fn created(&self) -> Vec<TerminalId> {
        self.lock().created.clone()
    }

    /// Ids successfully stopped, in call order.
    pub fn stopped(&self) -> Vec<TerminalId> {
        self.lock().stopped.clone()
    }

    pub fn running(&self) -> HashSet<TerminalId> {
        self.lock().running.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock state lock poisoned")
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_running_ids(&self) -> HashSet<TerminalId> {
        self.lock().running.clone()
    }

    async fn create_or_restart(&self, spec: &TerminalSpec) -> RuntimeResult<bool> {
        let mut state = self.lock();
        if state.error_on.contains(&spec.id) {
            return Err(RuntimeError::Unavailable("injected runtime failure".into()));
        }
        if state.fail_create.contains(&spec.id) {
            return Ok(false);
        }
        if !spec.missing_credentials().is_empty() {
            return Ok(false);
        }
        state.running.insert(spec.id.clone());
        state.created.push(spec.id.clone());
        Ok(true)
    }

    async fn stop_and_remove(&self, id: &str) -> RuntimeResult<bool> {
        let mut state = self.lock();
        if state.error_on.contains(id) {
            return Err(RuntimeError::Unavailable("injected runtime failure".into()));
        }
        if state.fail_stop.contains(id) {
            return Ok(false);
        }
        // Absent is success: the terminal already is not running.
        state.running.remove(id);
        state.stopped.push(id.to_string());
        Ok(true)
    }

    async fn status(&self, id: &str) -> RuntimeResult<Option<ContainerStatus>> {
        let state = self.lock();
        if state.error_on.contains(id) {
            return Err(RuntimeError::Unavailable("injected runtime failure".into()));
        }
        Ok(state
            .running
            .contains(id)
            .then_some(ContainerStatus::Running))
    }
}
