use std::time::Duration;

use loadmgr_core::{LoadSnapshot, MetricsBackend, TaskOutcome};
use tracing::{debug, info, trace, warn};

/// [`MetricsBackend`] that turns executor and controller events into log lines.
///
/// Useful on its own for console diagnostics, or next to a real metrics backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct Journal;

impl Journal {
    pub fn new() -> Self {
        Self
    }
}

#[inline]
fn message_for(outcome: TaskOutcome) -> &'static str {
    match outcome {
        TaskOutcome::Succeeded => "task succeeded",
        TaskOutcome::Failed => "task returned an error",
        TaskOutcome::Panicked => "task panicked (caught at task boundary)",
    }
}

impl MetricsBackend for Journal {
    fn task_admitted(&self, run: &str, gate_wait: Duration) {
        trace!(run, gate_wait_ms = gate_wait.as_millis() as u64, "task admitted");
    }

    fn task_finished(&self, run: &str, outcome: TaskOutcome, duration: Duration) {
        let msg = message_for(outcome);
        let duration_ms = duration.as_millis() as u64;
        match outcome {
            TaskOutcome::Succeeded => trace!(run, duration_ms, "{msg}"),
            TaskOutcome::Failed | TaskOutcome::Panicked => {
                warn!(run, outcome = outcome.as_str(), duration_ms, "{msg}")
            }
        }
    }

    fn queue_depth(&self, run: &str, queued: usize) {
        trace!(run, queued, "queue depth");
    }

    fn run_cancelled(&self, run: &str, not_admitted: usize) {
        info!(run, not_admitted, "run cancelled before all items were admitted");
    }

    fn concurrency_adjusted(&self, snapshot: &LoadSnapshot) {
        debug!(
            concurrency = snapshot.concurrency,
            live_load = snapshot.live_load,
            avg_1m = snapshot.avg_1m,
            avg_5m = snapshot.avg_5m,
            avg_15m = snapshot.avg_15m,
            "load observed"
        );
    }
}
