//! The reconciler: snapshot, plan, apply.

use tracing::{debug, error, info, warn};

use farm_api::ApiClient;
use farm_core::ReconcileStats;
use farm_runtime::ContainerRuntime;

use crate::plan::ReconcilePlan;

/// Drives one reconciliation pass against a runtime adapter.
///
/// Holds no state between passes; convergence across partial failures
/// comes from re-running the whole process, not from memory of what a
/// previous pass did.
pub struct Reconciler<R> {
    api: ApiClient,
    runtime: R,
}

impl<R: ContainerRuntime> Reconciler<R> {
    pub fn new(api: ApiClient, runtime: R) -> Self {
        Self { api, runtime }
    }

    /// Take a snapshot of desired and actual state and compute the
    /// plan. The two reads hit separate systems and are not
    /// transactionally consistent; repeated passes converge anyway.
    pub async fn plan(&self) -> ReconcilePlan {
        let desired = match self.api.fetch_desired().await {
            Ok(specs) => specs,
            Err(err) => {
                // Deliberate fail-safe: an upstream outage must not
                // abort the pass. The cost is that with an empty
                // desired list every running terminal is classified as
                // an orphan and stopped.
                warn!(
                    error = %err,
                    "desired-state fetch failed; continuing with empty desired state, \
                     all running terminals will be treated as orphans"
                );
                Vec::new()
            }
        };
        let actual = self.runtime.list_running_ids().await;
        debug!(
            desired = desired.len(),
            actual = actual.len(),
            "reconciliation snapshot taken"
        );
        ReconcilePlan::compute(&desired, &actual)
    }

    /// Apply a plan item by item, creates first, then stops.
    ///
    /// Each item is independent: a failure is counted and the rest of
    /// the plan still runs. Nothing is retried or rolled back here.
    pub async fn apply(&self, plan: ReconcilePlan) -> ReconcileStats {
        let mut stats = ReconcileStats::default();

        for spec in &plan.to_create {
            match self.runtime.create_or_restart(spec).await {
                Ok(true) => {
                    stats.created += 1;
                    info!(terminal = %spec.id, "terminal container created");
                }
                Ok(false) => {
                    stats.errors += 1;
                    error!(terminal = %spec.id, "failed to create terminal container");
                }
                Err(err) => {
                    stats.errors += 1;
                    error!(terminal = %spec.id, error = %err, "error creating terminal container");
                }
            }
        }

        for id in &plan.to_stop {
            match self.runtime.stop_and_remove(id).await {
                Ok(true) => {
                    stats.stopped += 1;
                    info!(terminal = %id, "terminal container stopped");
                }
                Ok(false) => {
                    stats.errors += 1;
                    error!(terminal = %id, "failed to stop terminal container");
                }
                Err(err) => {
                    stats.errors += 1;
                    error!(terminal = %id, error = %err, "error stopping terminal container");
                }
            }
        }

        info!(
            created = stats.created,
            stopped = stats.stopped,
            updated = stats.updated,
            errors = stats.errors,
            "reconciliation pass complete"
        );
        stats
    }

    /// One full pass: snapshot, plan, apply.
    pub async fn reconcile(&self) -> ReconcileStats {
        let plan = self.plan().await;
        self.apply(plan).await
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use farm_core::{DesiredStatus, OrchestratorConfig, TerminalSpec};
    use farm_runtime::MockRuntime;

    fn test_api() -> ApiClient {
        let config = OrchestratorConfig::from_lookup(|name| match name {
            "TRADING_JOURNAL_URL" => Some("http://127.0.0.1:9".to_string()),
            "ORCHESTRATOR_SECRET" => Some("secret".to_string()),
            "VM_DOCKER_HOST" => Some("tcp://localhost:2375".to_string()),
            "TERMINAL_WEBHOOK_SECRET" => Some("hook".to_string()),
            _ => None,
        })
        .unwrap();
        ApiClient::new(&config).unwrap()
    }

    fn spec(id: &str) -> TerminalSpec {
        TerminalSpec {
            id: id.to_string(),
            status: DesiredStatus::Running,
            server: "Broker-Demo".to_string(),
            login: "12345".to_string(),
            password: "pw".to_string(),
        }
    }

    #[tokio::test]
    async fn apply_counts_creates_and_stops() {
        let reconciler = Reconciler::new(test_api(), MockRuntime::with_running(["old"]));
        let plan = ReconcilePlan {
            to_create: vec![spec("a"), spec("b")],
            to_stop: vec!["old".to_string()],
        };

        let stats = reconciler.apply(plan).await;
        assert_eq!(stats.created, 2);
        assert_eq!(stats.stopped, 1);
        assert_eq!(stats.errors, 0);
        assert!(stats.is_clean());
    }

    #[tokio::test]
    async fn failing_item_does_not_abort_the_rest() {
        let runtime = MockRuntime::new().failing_create("b");
        let reconciler = Reconciler::new(test_api(), runtime);
        let plan = ReconcilePlan {
            to_create: vec![spec("a"), spec("b"), spec("c")],
            to_stop: Vec::new(),
        };

        let stats = reconciler.apply(plan).await;
        assert_eq!(stats.created, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(reconciler.runtime().created(), vec!["a", "c"]);
    }

    #[tokio::test]
    async fn hard_runtime_error_counts_like_a_failure() {
        let runtime = MockRuntime::with_running(["x", "y"]).erroring("x");
        let reconciler = Reconciler::new(test_api(), runtime);
        let plan = ReconcilePlan {
            to_create: Vec::new(),
            to_stop: vec!["x".to_string(), "y".to_string()],
        };

        let stats = reconciler.apply(plan).await;
        assert_eq!(stats.stopped, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(reconciler.runtime().stopped(), vec!["y"]);
    }

    #[tokio::test]
    async fn incomplete_credentials_count_as_error_without_creating() {
        let reconciler = Reconciler::new(test_api(), MockRuntime::new());
        let mut bad = spec("a");
        bad.server.clear();
        let plan = ReconcilePlan {
            to_create: vec![bad, spec("b")],
            to_stop: Vec::new(),
        };

        let stats = reconciler.apply(plan).await;
        assert_eq!(stats.created, 1);
        assert_eq!(stats.errors, 1);
        assert_eq!(reconciler.runtime().created(), vec!["b"]);
    }

    #[tokio::test]
    async fn updated_counter_stays_reserved() {
        let reconciler = Reconciler::new(test_api(), MockRuntime::new());
        let stats = reconciler.apply(ReconcilePlan::default()).await;
        assert_eq!(stats.updated, 0);
    }
}
