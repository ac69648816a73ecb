//! farm-reconciler: the convergence engine.
//!
//! One pass is fetch, diff, apply: read the desired terminal list from
//! the control plane, observe which terminal containers are running,
//! classify every terminal as create / stop / leave-alone, then drive
//! the runtime adapter item by item. Failures are isolated per item
//! and counted; nothing is retried or rolled back within a pass.
//!
//! The controller is level-triggered: each pass recomputes the whole
//! plan from current state, so drift and partial failures heal on the
//! next invocation.

pub mod engine;
pub mod plan;

pub use engine::Reconciler;
pub use plan::ReconcilePlan;
