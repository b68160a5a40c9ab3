use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use loadmgr_core::{
    BoundedExecutor, ControllerConfig, LoadSnapshot, Metadata, MetricsBackend, RunContext,
    TaskOutcome,
};
use loadmgr_observe::{Journal, LoggerConfig, logger_init};
use loadmgr_prometheus::{PrometheusMetrics, TextEncoder};

/// Records into Prometheus and logs every event.
struct Tee {
    prometheus: PrometheusMetrics,
    journal: Journal,
}

impl MetricsBackend for Tee {
    fn task_admitted(&self, run: &str, gate_wait: Duration) {
        self.prometheus.task_admitted(run, gate_wait);
        self.journal.task_admitted(run, gate_wait);
    }

    fn task_finished(&self, run: &str, outcome: TaskOutcome, duration: Duration) {
        self.prometheus.task_finished(run, outcome, duration);
        self.journal.task_finished(run, outcome, duration);
    }

    fn queue_depth(&self, run: &str, queued: usize) {
        self.prometheus.queue_depth(run, queued);
        self.journal.queue_depth(run, queued);
    }

    fn run_cancelled(&self, run: &str, not_admitted: usize) {
        self.prometheus.run_cancelled(run, not_admitted);
        self.journal.run_cancelled(run, not_admitted);
    }

    fn concurrency_adjusted(&self, snapshot: &LoadSnapshot) {
        self.prometheus.concurrency_adjusted(snapshot);
        self.journal.concurrency_adjusted(snapshot);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Logger (LOADMGR_LOG / LOADMGR_LOG_FORMAT)
    let cfg = LoggerConfig::from_env().context("logger config")?;
    logger_init(&cfg).context("logger init")?;
    info!(format = %cfg.format, level = %cfg.level, "logger initialized");

    // 2) Metrics
    let prometheus = PrometheusMetrics::new().context("prometheus registry")?;
    let metrics = Arc::new(Tee {
        prometheus: prometheus.clone(),
        journal: Journal::new(),
    });

    // 3) Request context; Ctrl+C cancels the run
    let ctx = RunContext::new().with_incoming(Metadata::from_pairs([
        ("x-request-id", "demo-0001"),
        ("tenant", "local"),
    ]));
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; cancelling run");
            interrupt.cancel();
        }
    });

    // 4) Adaptive batch: item 7 fails, item 13 panics
    let executor = BoundedExecutor::new("adaptive-batch")
        .with_metrics(metrics)
        .with_controller_config(
            ControllerConfig::new(8, 80.0)
                .with_tick(Duration::from_millis(250))
                .with_sample_interval(Duration::from_millis(200)),
        );

    let result = executor
        .run_adaptive(&ctx, 0..40u32, |ctx, item| async move {
            let (background, _cancel) = ctx.derive_outgoing().map_err(|e| e.to_string())?;
            let request_id = background
                .outgoing()
                .and_then(|md| md.get("x-request-id"))
                .unwrap_or("-")
                .to_string();

            tokio::select! {
                _ = ctx.cancelled() => return Ok(()),
                _ = tokio::time::sleep(Duration::from_millis(50 + u64::from(item % 5) * 20)) => {}
            }
            match item {
                7 => Err(format!("item {item} rejected (request {request_id})")),
                13 => panic!("item {item} hit a bug"),
                _ => Ok(()),
            }
        })
        .await;

    // 5) Report
    match &result {
        Ok(()) => info!("batch finished without errors"),
        Err(e) if e.is_panic() => warn!(error = %e, "batch finished with a panic"),
        Err(e) => warn!(error = %e, "batch finished with an error"),
    }

    let text = TextEncoder::new()
        .encode_to_string(&prometheus.gather())
        .context("encode metrics")?;
    println!("{text}");

    Ok(())
}
