use std::time::Duration;

use loadmgr_core::{LoadSnapshot, MetricsBackend, TaskOutcome};
use prometheus::{
    CounterVec, Gauge, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry,
};

const RUN: &str = "run";
const OUTCOME: &str = "outcome";

/// Admission waits are usually far below task durations.
const GATE_WAIT_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// [`MetricsBackend`] recording into its own Prometheus registry.
///
/// Clones share the registry and every collector.
#[derive(Clone)]
pub struct PrometheusMetrics {
    registry: Registry,

    in_progress: IntGaugeVec,
    succeeded: IntCounterVec,
    errors: IntCounterVec,
    task_duration: HistogramVec,
    gate_wait: HistogramVec,
    processing_time: CounterVec,
    queue_length: IntGaugeVec,
    not_admitted: IntCounterVec,

    concurrency_limit: IntGauge,
    load_percent: Gauge,
}

impl PrometheusMetrics {
    /// Create a backend with a fresh registry.
    pub fn new() -> Result<Self, prometheus::Error> {
        Self::with_registry(Registry::new())
    }

    /// Create a backend registering into an existing registry.
    ///
    /// Fails if the registry already holds collectors with the same names.
    pub fn with_registry(registry: Registry) -> Result<Self, prometheus::Error> {
        let in_progress = IntGaugeVec::new(
            Opts::new("loadmgr_tasks_in_progress", "Tasks currently running"),
            &[RUN],
        )?;
        let succeeded = IntCounterVec::new(
            Opts::new(
                "loadmgr_tasks_succeeded_total",
                "Tasks that returned without error",
            ),
            &[RUN],
        )?;
        let errors = IntCounterVec::new(
            Opts::new("loadmgr_task_errors_total", "Tasks that failed or panicked"),
            &[RUN, OUTCOME],
        )?;
        let task_duration = HistogramVec::new(
            HistogramOpts::new(
                "loadmgr_task_duration_seconds",
                "Time spent inside the worker per task",
            ),
            &[RUN],
        )?;
        let gate_wait = HistogramVec::new(
            HistogramOpts::new(
                "loadmgr_gate_wait_duration_seconds",
                "Time an item waited for an admission slot",
            )
            .buckets(GATE_WAIT_BUCKETS.to_vec()),
            &[RUN],
        )?;
        let processing_time = CounterVec::new(
            Opts::new(
                "loadmgr_processing_time_seconds_total",
                "Cumulative time spent inside workers",
            ),
            &[RUN],
        )?;
        let queue_length = IntGaugeVec::new(
            Opts::new("loadmgr_queue_length", "Items waiting for admission"),
            &[RUN],
        )?;
        let not_admitted = IntCounterVec::new(
            Opts::new(
                "loadmgr_tasks_not_admitted_total",
                "Items never started because the run was cancelled",
            ),
            &[RUN],
        )?;
        let concurrency_limit = IntGauge::new(
            "loadmgr_concurrency_limit",
            "Concurrency level published by the load controller",
        )?;
        let load_percent = Gauge::new(
            "loadmgr_load_percent",
            "Combined CPU and memory load observed by the load controller",
        )?;

        registry.register(Box::new(in_progress.clone()))?;
        registry.register(Box::new(succeeded.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(task_duration.clone()))?;
        registry.register(Box::new(gate_wait.clone()))?;
        registry.register(Box::new(processing_time.clone()))?;
        registry.register(Box::new(queue_length.clone()))?;
        registry.register(Box::new(not_admitted.clone()))?;
        registry.register(Box::new(concurrency_limit.clone()))?;
        registry.register(Box::new(load_percent.clone()))?;

        Ok(Self {
            registry,
            in_progress,
            succeeded,
            errors,
            task_duration,
            gate_wait,
            processing_time,
            queue_length,
            not_admitted,
            concurrency_limit,
            load_percent,
        })
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Collect all metric families for exposition.
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

impl MetricsBackend for PrometheusMetrics {
    fn task_admitted(&self, run: &str, gate_wait: Duration) {
        self.in_progress.with_label_values(&[run]).inc();
        self.gate_wait
            .with_label_values(&[run])
            .observe(gate_wait.as_secs_f64());
    }

    fn task_finished(&self, run: &str, outcome: TaskOutcome, duration: Duration) {
        let secs = duration.as_secs_f64();
        self.in_progress.with_label_values(&[run]).dec();
        self.task_duration.with_label_values(&[run]).observe(secs);
        self.processing_time.with_label_values(&[run]).inc_by(secs);

        if outcome.is_error() {
            self.errors
                .with_label_values(&[run, outcome.as_str()])
                .inc();
        } else {
            self.succeeded.with_label_values(&[run]).inc();
        }
    }

    fn queue_depth(&self, run: &str, queued: usize) {
        self.queue_length
            .with_label_values(&[run])
            .set(i64::try_from(queued).unwrap_or(i64::MAX));
    }

    fn run_cancelled(&self, run: &str, not_admitted: usize) {
        self.not_admitted
            .with_label_values(&[run])
            .inc_by(not_admitted as u64);
        self.queue_length.with_label_values(&[run]).set(0);
    }

    fn concurrency_adjusted(&self, snapshot: &LoadSnapshot) {
        self.concurrency_limit
            .set(i64::try_from(snapshot.concurrency).unwrap_or(i64::MAX));
        self.load_percent.set(snapshot.live_load);
    }
}
