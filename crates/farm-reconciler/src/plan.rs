//! Plan computation: the pure diff between desired and actual state.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use farm_core::{DesiredStatus, TerminalId, TerminalSpec};

/// The corrective actions for one pass.
///
/// `to_create` and `to_stop` are disjoint by construction: a desired
/// entry lands in at most one of them, and orphans are by definition
/// not in the desired set. The plan is transient; it is recomputed
/// from scratch every pass and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Terminals that should be running but are not.
    pub to_create: Vec<TerminalSpec>,
    /// Terminals that are running but should not be, including
    /// orphans the control plane no longer knows about.
    pub to_stop: Vec<TerminalId>,
}

impl ReconcilePlan {
    /// Classify every terminal from one consistent snapshot of desired
    /// and actual state.
    ///
    /// Desired entries are walked in API order; orphan ids are sorted
    /// before being appended so apply order is deterministic.
    pub fn compute(desired: &[TerminalSpec], actual: &HashSet<TerminalId>) -> Self {
        let mut plan = Self::default();
        let mut desired_ids: HashSet<&str> = HashSet::with_capacity(desired.len());

        for spec in desired {
            if spec.id.is_empty() {
                warn!("skipping desired-state entry with empty id");
                continue;
            }
            desired_ids.insert(&spec.id);

            match spec.status {
                DesiredStatus::Running if !actual.contains(&spec.id) => {
                    info!(terminal = %spec.id, "should be running but no container found");
                    plan.to_create.push(spec.clone());
                }
                DesiredStatus::Stopped if actual.contains(&spec.id) => {
                    info!(terminal = %spec.id, "should be stopped but container is running");
                    plan.to_stop.push(spec.id.clone());
                }
                _ => {
                    debug!(terminal = %spec.id, status = ?spec.status, "already converged");
                }
            }
        }

        let mut orphans: Vec<TerminalId> = actual
            .iter()
            .filter(|id| !desired_ids.contains(id.as_str()))
            .cloned()
            .collect();
        orphans.sort();
        for id in &orphans {
            info!(terminal = %id, "orphaned container not in desired state");
        }
        plan.to_stop.extend(orphans);

        plan
    }

    /// True when the pass has nothing to do.
    pub fn is_converged(&self) -> bool {
        self.to_create.is_empty() && self.to_stop.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(id: &str) -> TerminalSpec {
        TerminalSpec {
            id: id.to_string(),
            status: DesiredStatus::Running,
            server: "Broker-Demo".to_string(),
            login: "12345".to_string(),
            password: "pw".to_string(),
        }
    }

    fn stopped(id: &str) -> TerminalSpec {
        TerminalSpec {
            status: DesiredStatus::Stopped,
            ..running(id)
        }
    }

    fn actual(ids: &[&str]) -> HashSet<TerminalId> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn mixed_state_classifies_create_stop_and_orphan() {
        // A should run but isn't; B should be stopped but runs; C is
        // an orphan.
        let desired = vec![running("A"), stopped("B")];
        let plan = ReconcilePlan::compute(&desired, &actual(&["B", "C"]));

        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].id, "A");
        assert_eq!(plan.to_stop, vec!["B", "C"]);
    }

    #[test]
    fn converged_state_yields_empty_plan() {
        let desired = vec![running("A"), stopped("B")];
        let plan = ReconcilePlan::compute(&desired, &actual(&["A"]));
        assert!(plan.is_converged());
    }

    #[test]
    fn empty_desired_stops_everything_running() {
        let plan = ReconcilePlan::compute(&[], &actual(&["X"]));
        assert!(plan.to_create.is_empty());
        assert_eq!(plan.to_stop, vec!["X"]);
    }

    #[test]
    fn create_and_stop_are_disjoint() {
        let desired = vec![
            running("A"),
            stopped("B"),
            running("C"),
            stopped("D"),
        ];
        let plan = ReconcilePlan::compute(&desired, &actual(&["B", "C", "E"]));

        let create_ids: HashSet<&str> = plan.to_create.iter().map(|s| s.id.as_str()).collect();
        let stop_ids: HashSet<&str> = plan.to_stop.iter().map(String::as_str).collect();
        assert!(create_ids.is_disjoint(&stop_ids));
        assert_eq!(create_ids, HashSet::from(["A"]));
        assert_eq!(stop_ids, HashSet::from(["B", "E"]));
    }

    #[test]
    fn every_orphan_is_stopped() {
        let desired = vec![running("A")];
        let plan = ReconcilePlan::compute(&desired, &actual(&["A", "Z", "Y", "X"]));
        // Sorted for deterministic apply order.
        assert_eq!(plan.to_stop, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn empty_id_entries_are_skipped_not_orphan_matched() {
        let desired = vec![running(""), running("A")];
        let plan = ReconcilePlan::compute(&desired, &actual(&[]));
        assert_eq!(plan.to_create.len(), 1);
        assert_eq!(plan.to_create[0].id, "A");
    }

    #[test]
    fn stopped_and_not_running_is_a_noop() {
        let desired = vec![stopped("B")];
        let plan = ReconcilePlan::compute(&desired, &actual(&[]));
        assert!(plan.is_converged());
    }
}
