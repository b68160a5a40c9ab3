//! Instrumentation seam for the executor and the controller.
//!
//! The core only emits events; exporting them is up to the backend (`loadmgr-prometheus`, the logging `Journal` in `loadmgr-observe`, or anything else).
//! Every hook has an empty default so a backend implements only what it records.
use std::sync::Arc;
use std::time::Duration;

use loadmgr_model::{LoadSnapshot, TaskOutcome};

/// Receiver of executor and controller events.
///
/// `run` is the executor name the events belong to.
pub trait MetricsBackend: Send + Sync {
    /// A task acquired an admission slot after waiting `gate_wait`.
    ///
    /// The task counts as in flight until the matching [`MetricsBackend::task_finished`].
    fn task_admitted(&self, _run: &str, _gate_wait: Duration) {}

    /// An admitted task ended. `duration` is the time spent inside the worker.
    fn task_finished(&self, _run: &str, _outcome: TaskOutcome, _duration: Duration) {}

    /// Number of items not yet admitted.
    fn queue_depth(&self, _run: &str, _queued: usize) {}

    /// The run was cancelled with `not_admitted` items never started.
    fn run_cancelled(&self, _run: &str, _not_admitted: usize) {}

    /// The controller published a new observation.
    fn concurrency_adjusted(&self, _snapshot: &LoadSnapshot) {}
}

/// Shared handle to a metrics backend.
pub type MetricsHandle = Arc<dyn MetricsBackend>;

/// Backend that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsBackend for NoopMetrics {}

/// Default backend handle.
pub fn noop() -> MetricsHandle {
    Arc::new(NoopMetrics)
}
