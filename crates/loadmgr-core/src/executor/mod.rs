//! Bounded parallel executor.
//!
//! ## Overview
//! Every item goes through an admission gate sized to the current concurrency limit, then runs `worker(ctx, item)` on its own tokio task.
//! - **Fixed** runs ([`BoundedExecutor::run`]) keep the limit they were given.
//! - **Adaptive** runs ([`BoundedExecutor::run_adaptive`], [`BoundedExecutor::run_with_controller`]) follow the limit published by a [`ConcurrencyController`]; a new limit only affects items not yet admitted.
//!
//! ## Failure handling
//! - A worker error or panic never stops other tasks; panics are caught at the task boundary and become [`RunError::Panicked`].
//! - The run keeps the first error observed at the join point and returns it once every admitted task finished.
//! - If the caller's context is cancelled before the run completes, the run returns [`RunError::Cancelled`] once every admitted task unwound, whatever the tasks returned.
//!
//! ## Invariants
//! - At most `limit` workers run at any instant, including across limit changes.
//! - A slot is released on every exit path of a task (the permit is dropped with the task).
mod gate;
mod panic_trace;

use std::{
    any::Any,
    backtrace::Backtrace,
    borrow::Cow,
    fmt,
    future::{Future, poll_fn},
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::FutureExt;
use loadmgr_model::{LoadSnapshot, TaskOutcome};
use tokio::{
    sync::{OwnedSemaphorePermit, watch},
    task::{JoinError, JoinSet},
};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    context::RunContext,
    controller::{ConcurrencyController, ControllerConfig, DEFAULT_THRESHOLD, LoadController},
    error::RunError,
    load::SystemLoadSampler,
    metrics::{MetricsHandle, noop},
};
use gate::AdmissionGate;

/// Ceiling of the controller started by [`BoundedExecutor::run_adaptive`].
pub const DEFAULT_INITIAL_LIMIT: usize = 10;

type TaskResult<E> = Result<(), RunError<E>>;

/// Executor settings and collaborators, reusable across runs.
#[derive(Clone)]
pub struct BoundedExecutor {
    name: Cow<'static, str>,
    metrics: MetricsHandle,
    cancel_on_error: bool,
    controller: ControllerConfig,
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new("default")
    }
}

impl BoundedExecutor {
    /// Executor labelled `name` in logs and metrics.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            metrics: noop(),
            cancel_on_error: false,
            controller: ControllerConfig::new(DEFAULT_INITIAL_LIMIT, DEFAULT_THRESHOLD),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Stop admitting new items after the first task error.
    ///
    /// Already running tasks see their context cancelled; the first error is still what the run returns.
    pub fn with_cancel_on_error(mut self, enabled: bool) -> Self {
        self.cancel_on_error = enabled;
        self
    }

    /// Controller settings used by [`BoundedExecutor::run_adaptive`].
    pub fn with_controller_config(mut self, cfg: ControllerConfig) -> Self {
        self.controller = cfg.normalized();
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `worker` over `items` with at most `limit` concurrent invocations.
    ///
    /// `limit` below 1 is treated as 1. Must be called within a tokio runtime.
    pub async fn run<I, T, F, Fut, E>(
        &self,
        ctx: &RunContext,
        items: I,
        limit: usize,
        worker: F,
    ) -> Result<(), RunError<E>>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let items: Vec<T> = items.into_iter().collect();
        self.dispatch(ctx, items, AdmissionGate::new(limit), None, worker)
            .await
    }

    /// Run with a limit driven by a host-load controller started for this run.
    ///
    /// The controller starts at half of its ceiling and is shut down when the run returns.
    pub async fn run_adaptive<I, T, F, Fut, E>(
        &self,
        ctx: &RunContext,
        items: I,
        worker: F,
    ) -> Result<(), RunError<E>>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let items: Vec<T> = items.into_iter().collect();
        if items.is_empty() {
            return Ok(());
        }

        let sampler = SystemLoadSampler::with_interval(self.controller.sample_interval);
        let controller = ConcurrencyController::spawn(
            LoadController::new(&self.controller, sampler).with_metrics(Arc::clone(&self.metrics)),
        );
        let result = self.run_with_controller(ctx, items, &controller, worker).await;
        controller.shutdown().await;
        result
    }

    /// Run with a limit driven by an existing controller, which may be shared between runs.
    pub async fn run_with_controller<I, T, F, Fut, E>(
        &self,
        ctx: &RunContext,
        items: I,
        controller: &ConcurrencyController,
        worker: F,
    ) -> Result<(), RunError<E>>
    where
        I: IntoIterator<Item = T>,
        T: Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        let items: Vec<T> = items.into_iter().collect();
        let mut limits = controller.subscribe();
        let gate = AdmissionGate::new(limits.borrow_and_update().concurrency);
        self.dispatch(ctx, items, gate, Some(limits), worker).await
    }

    #[instrument(
        name = "run",
        level = "debug",
        skip_all,
        fields(run = %self.name, run_id = %Uuid::new_v4(), items = items.len())
    )]
    async fn dispatch<T, F, Fut, E>(
        &self,
        ctx: &RunContext,
        items: Vec<T>,
        mut gate: AdmissionGate,
        mut limits: Option<watch::Receiver<LoadSnapshot>>,
        worker: F,
    ) -> Result<(), RunError<E>>
    where
        T: Send + 'static,
        F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: fmt::Display + Send + 'static,
    {
        if items.is_empty() {
            return Ok(());
        }
        panic_trace::install();

        let run: Arc<str> = Arc::from(self.name.as_ref());
        let run_ctx = ctx.child();
        let worker = Arc::new(worker);
        let total = items.len();

        let mut tasks: JoinSet<TaskResult<E>> = JoinSet::new();
        let mut outcome = Outcome::default();
        let mut admitted = 0usize;
        self.metrics.queue_depth(&run, total);

        'dispatch: for item in items {
            let wait = Instant::now();
            let (permit, waited) = loop {
                let next = tokio::select! {
                    biased;
                    _ = run_ctx.cancelled() => Admission::Cancelled,
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => Admission::Joined(joined),
                    limit = next_limit(&mut limits) => Admission::Resized(limit),
                    permit = gate.acquire() => Admission::Permit(permit),
                };
                match next {
                    Admission::Cancelled | Admission::Permit(None) => break 'dispatch,
                    Admission::Joined(joined) => outcome.observe(joined),
                    Admission::Resized(Some(limit)) => {
                        if limit != gate.limit() {
                            debug!(from = gate.limit(), to = limit, "admission limit changed");
                            gate.resize(limit);
                        }
                    }
                    Admission::Resized(None) => {
                        debug!(limit = gate.limit(), "controller gone; keeping last limit");
                        limits = None;
                    }
                    Admission::Permit(Some(permit)) => break (permit, wait.elapsed()),
                }
            };

            admitted += 1;
            self.metrics.queue_depth(&run, total - admitted);
            self.metrics.task_admitted(&run, waited);

            tasks.spawn(run_task(
                permit,
                Arc::clone(&worker),
                run_ctx.clone(),
                item,
                Arc::clone(&run),
                Arc::clone(&self.metrics),
                self.cancel_on_error,
            ));
        }

        let not_admitted = total - admitted;
        info!(admitted, not_admitted, "dispatch finished; waiting for tasks");

        while let Some(joined) = tasks.join_next().await {
            outcome.observe(joined);
        }

        let interrupted = ctx.is_cancelled();
        if not_admitted > 0 {
            self.metrics.run_cancelled(&run, not_admitted);
        }
        info!(failed = outcome.failed, interrupted, "done waiting");

        if interrupted {
            return Err(RunError::Cancelled);
        }
        match outcome.first {
            Some(err) => Err(err),
            // Only reachable through cancel-on-error, which always records the error first.
            None if not_admitted > 0 => Err(RunError::Cancelled),
            None => Ok(()),
        }
    }
}

enum Admission<E> {
    Cancelled,
    Joined(Result<TaskResult<E>, JoinError>),
    Resized(Option<usize>),
    Permit(Option<OwnedSemaphorePermit>),
}

/// First-error-wins aggregation, owned by the join point.
struct Outcome<E> {
    first: Option<RunError<E>>,
    failed: usize,
}

impl<E> Default for Outcome<E> {
    fn default() -> Self {
        Self {
            first: None,
            failed: 0,
        }
    }
}

impl<E> Outcome<E> {
    fn observe(&mut self, joined: Result<TaskResult<E>, JoinError>) {
        let result = joined.unwrap_or_else(|e| Err(join_error(e)));
        if let Err(err) = result {
            self.failed += 1;
            if self.first.is_none() {
                self.first = Some(err);
            }
        }
    }
}

/// Next limit published by the controller; `None` once the controller is gone.
/// Pending forever for fixed-limit runs.
async fn next_limit(limits: &mut Option<watch::Receiver<LoadSnapshot>>) -> Option<usize> {
    match limits {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().concurrency),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

async fn run_task<T, F, Fut, E>(
    permit: OwnedSemaphorePermit,
    worker: Arc<F>,
    ctx: RunContext,
    item: T,
    run: Arc<str>,
    metrics: MetricsHandle,
    cancel_on_error: bool,
) -> TaskResult<E>
where
    F: Fn(RunContext, T) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: fmt::Display,
{
    let _permit = permit;
    let started = Instant::now();
    let token = ctx.token().clone();

    let mut call = Box::pin(async move { (*worker)(ctx, item).await });
    let caught = AssertUnwindSafe(poll_fn(move |cx| {
        let _armed = panic_trace::Scope::enter();
        call.as_mut().poll(cx)
    }))
    .catch_unwind()
    .await;
    let elapsed = started.elapsed();

    let (result, outcome) = match caught {
        Ok(Ok(())) => (Ok(()), TaskOutcome::Succeeded),
        Ok(Err(e)) => {
            warn!(run = %run, error = %e, elapsed_ms = millis(elapsed), "task failed");
            (Err(RunError::Task(e)), TaskOutcome::Failed)
        }
        Err(payload) => {
            let backtrace = panic_trace::take().unwrap_or_else(capture);
            let message = panic_message(payload.as_ref());
            error!(run = %run, %message, %backtrace, "task panicked");
            (
                Err(RunError::Panicked { message, backtrace }),
                TaskOutcome::Panicked,
            )
        }
    };
    metrics.task_finished(&run, outcome, elapsed);

    if result.is_err() && cancel_on_error {
        token.cancel();
    }
    result
}

fn capture() -> String {
    Backtrace::force_capture().to_string()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn join_error<E>(e: JoinError) -> RunError<E> {
    if e.is_panic() {
        RunError::Panicked {
            message: panic_message(e.into_panic().as_ref()),
            backtrace: capture(),
        }
    } else {
        RunError::Cancelled
    }
}

#[inline]
fn millis(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}

/// [`BoundedExecutor::run`] with a default executor.
pub async fn run_bounded<I, T, F, Fut, E>(
    ctx: &RunContext,
    items: I,
    limit: usize,
    worker: F,
) -> Result<(), RunError<E>>
where
    I: IntoIterator<Item = T>,
    T: Send + 'static,
    F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    BoundedExecutor::default().run(ctx, items, limit, worker).await
}

/// [`BoundedExecutor::run_adaptive`] with a default executor.
pub async fn run_adaptive<I, T, F, Fut, E>(
    ctx: &RunContext,
    items: I,
    worker: F,
) -> Result<(), RunError<E>>
where
    I: IntoIterator<Item = T>,
    T: Send + 'static,
    F: Fn(RunContext, T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    BoundedExecutor::default()
        .run_adaptive(ctx, items, worker)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::StaticLoad;
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };
    use tokio::time::sleep;

    #[derive(Debug, PartialEq, Eq)]
    struct Boom(u32);

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "boom {}", self.0)
        }
    }

    #[derive(Default)]
    struct Tracker {
        active: AtomicUsize,
        peak: AtomicUsize,
        started: AtomicUsize,
        done: AtomicUsize,
    }

    impl Tracker {
        fn enter(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.active.fetch_sub(1, Ordering::SeqCst);
            self.done.fetch_add(1, Ordering::SeqCst);
        }

        fn peak(&self) -> usize {
            self.peak.load(Ordering::SeqCst)
        }

        fn started(&self) -> usize {
            self.started.load(Ordering::SeqCst)
        }

        fn done(&self) -> usize {
            self.done.load(Ordering::SeqCst)
        }
    }

    /// Worker sleeping `work` per item and failing on `fail_on`.
    fn sleeper(
        tracker: Arc<Tracker>,
        work: Duration,
        fail_on: Option<u32>,
    ) -> impl Fn(RunContext, u32) -> futures::future::BoxFuture<'static, Result<(), Boom>>
    + Send
    + Sync
    + 'static {
        move |ctx, i| {
            let tracker = Arc::clone(&tracker);
            Box::pin(async move {
                tracker.enter();
                tokio::select! {
                    _ = ctx.cancelled() => {}
                    _ = sleep(work) => {}
                }
                tracker.leave();
                if Some(i) == fail_on { Err(Boom(i)) } else { Ok(()) }
            })
        }
    }

    #[tokio::test]
    async fn empty_items_succeed_without_work() {
        let tracker = Arc::new(Tracker::default());
        let res = run_bounded(
            &RunContext::new(),
            Vec::<u32>::new(),
            4,
            sleeper(Arc::clone(&tracker), Duration::ZERO, None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.started(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn all_items_complete() {
        let tracker = Arc::new(Tracker::default());
        let res = run_bounded(
            &RunContext::new(),
            0..20u32,
            3,
            sleeper(Arc::clone(&tracker), Duration::from_millis(5), None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.done(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_failure_is_returned() {
        let tracker = Arc::new(Tracker::default());
        let err = run_bounded(
            &RunContext::new(),
            0..10u32,
            4,
            sleeper(Arc::clone(&tracker), Duration::from_millis(5), Some(7)),
        )
        .await
        .unwrap_err();

        assert_eq!(err.task_error(), Some(&Boom(7)));
        assert_eq!(err.to_string(), "task failed: boom 7");
        // Other items were not stopped by the failure.
        assert_eq!(tracker.done(), 10);
    }

    #[inline(never)]
    fn explode_in_worker(i: u32) {
        panic!("worker exploded on {i}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn panic_is_contained() {
        let done = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&done);
        let res = run_bounded(&RunContext::new(), 0..8u32, 3, move |_ctx, i| {
            let counter = Arc::clone(&counter);
            async move {
                sleep(Duration::from_millis(2)).await;
                if i == 3 {
                    explode_in_worker(i);
                }
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<(), Boom>(())
            }
        })
        .await;

        match res {
            Err(RunError::Panicked { message, backtrace }) => {
                assert_eq!(message, "worker exploded on 3");
                assert!(
                    backtrace.contains("explode_in_worker"),
                    "backtrace lacks the panicking frame:\n{backtrace}"
                );
            }
            other => panic!("expected panic error, got {other:?}"),
        }
        assert_eq!(done.load(Ordering::SeqCst), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn limit_one_never_overlaps() {
        let spans = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&spans);
        let res = run_bounded(&RunContext::new(), 0..6u32, 1, move |_ctx, _i| {
            let log = Arc::clone(&log);
            async move {
                let start = Instant::now();
                sleep(Duration::from_millis(5)).await;
                log.lock().unwrap().push((start, Instant::now()));
                Ok::<(), Boom>(())
            }
        })
        .await;
        assert!(res.is_ok());

        let mut spans = spans.lock().unwrap().clone();
        spans.sort();
        assert_eq!(spans.len(), 6);
        for pair in spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0, "execution intervals overlap");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn limit_k_is_reached_but_never_exceeded() {
        let tracker = Arc::new(Tracker::default());
        let res = run_bounded(
            &RunContext::new(),
            0..40u32,
            4,
            sleeper(Arc::clone(&tracker), Duration::from_millis(10), None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.peak(), 4);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn zero_limit_is_clamped_to_one() {
        let tracker = Arc::new(Tracker::default());
        let res = run_bounded(
            &RunContext::new(),
            0..5u32,
            0,
            sleeper(Arc::clone(&tracker), Duration::from_millis(2), None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.peak(), 1);
        assert_eq!(tracker.done(), 5);
    }

    #[tokio::test]
    async fn cancelled_before_dispatch_starts_nothing() {
        let ctx = RunContext::new();
        ctx.cancel();

        let tracker = Arc::new(Tracker::default());
        let err = run_bounded(
            &ctx,
            0..10u32,
            4,
            sleeper(Arc::clone(&tracker), Duration::from_millis(1), None),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(tracker.started(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancellation_mid_run_returns_promptly() {
        let ctx = RunContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let tracker = Arc::new(Tracker::default());
        let started = Instant::now();
        let err = run_bounded(
            &ctx,
            0..1000u32,
            2,
            sleeper(Arc::clone(&tracker), Duration::from_millis(20), None),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(tracker.started() < 1000);
        // Every admitted task unwound before the run returned.
        assert_eq!(tracker.started(), tracker.done());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancellation_after_full_admission_is_reported() {
        let ctx = RunContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(30)).await;
            canceller.cancel();
        });

        let tracker = Arc::new(Tracker::default());
        let err = run_bounded(
            &ctx,
            0..2u32,
            4,
            sleeper(Arc::clone(&tracker), Duration::from_secs(30), None),
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(tracker.started(), 2);
        assert_eq!(tracker.done(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn oversized_limit_is_capped() {
        let tracker = Arc::new(Tracker::default());
        let res = run_bounded(
            &RunContext::new(),
            0..3u32,
            usize::MAX,
            sleeper(Arc::clone(&tracker), Duration::from_millis(1), None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.done(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn cancel_on_error_stops_admissions() {
        let tracker = Arc::new(Tracker::default());
        let exec = BoundedExecutor::new("fail-fast").with_cancel_on_error(true);
        let err = exec
            .run(
                &RunContext::new(),
                0..200u32,
                1,
                sleeper(Arc::clone(&tracker), Duration::from_millis(2), Some(0)),
            )
            .await
            .unwrap_err();

        assert_eq!(err.task_error(), Some(&Boom(0)));
        assert!(tracker.started() < 200);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn controller_limit_is_respected() {
        let cfg = ControllerConfig::new(6, 80.0).with_tick(Duration::from_millis(5));
        let controller = ConcurrencyController::start(&cfg, StaticLoad::new(99.0));

        let tracker = Arc::new(Tracker::default());
        let res = BoundedExecutor::new("adaptive")
            .run_with_controller(
                &RunContext::new(),
                0..60u32,
                &controller,
                sleeper(Arc::clone(&tracker), Duration::from_millis(10), None),
            )
            .await;

        assert!(res.is_ok());
        assert_eq!(tracker.done(), 60);
        assert!(tracker.peak() <= 6);
        controller.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn shrinking_limit_caps_new_admissions() {
        let cfg = ControllerConfig::new(8, 80.0).with_tick(Duration::from_millis(5));
        let controller = ConcurrencyController::start(&cfg, StaticLoad::new(0.0));

        let tracker = Arc::new(Tracker::default());
        let res = BoundedExecutor::new("shrinking")
            .run_with_controller(
                &RunContext::new(),
                0..30u32,
                &controller,
                sleeper(Arc::clone(&tracker), Duration::from_millis(10), None),
            )
            .await;

        assert!(res.is_ok());
        assert!(tracker.peak() <= 4);
        assert_eq!(controller.concurrency(), 1);
        controller.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn adaptive_run_against_host() {
        let tracker = Arc::new(Tracker::default());
        let res = run_adaptive(
            &RunContext::new(),
            0..5u32,
            sleeper(Arc::clone(&tracker), Duration::from_millis(10), None),
        )
        .await;
        assert!(res.is_ok());
        assert_eq!(tracker.done(), 5);
        assert!(tracker.peak() <= DEFAULT_INITIAL_LIMIT);
    }

    #[derive(Default)]
    struct Counting {
        admitted: AtomicUsize,
        succeeded: AtomicUsize,
        failed: AtomicUsize,
        queued: AtomicUsize,
    }

    impl crate::metrics::MetricsBackend for Counting {
        fn task_admitted(&self, _run: &str, _gate_wait: Duration) {
            self.admitted.fetch_add(1, Ordering::SeqCst);
        }

        fn task_finished(&self, run: &str, outcome: TaskOutcome, _duration: Duration) {
            assert_eq!(run, "counted");
            match outcome {
                TaskOutcome::Succeeded => self.succeeded.fetch_add(1, Ordering::SeqCst),
                _ => self.failed.fetch_add(1, Ordering::SeqCst),
            };
        }

        fn queue_depth(&self, _run: &str, queued: usize) {
            self.queued.store(queued, Ordering::SeqCst);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn metrics_see_every_task() {
        let metrics = Arc::new(Counting::default());
        let tracker = Arc::new(Tracker::default());
        let exec = BoundedExecutor::new("counted").with_metrics(metrics.clone());

        let res = exec
            .run(
                &RunContext::new(),
                0..12u32,
                3,
                sleeper(Arc::clone(&tracker), Duration::from_millis(2), Some(5)),
            )
            .await;

        assert!(res.is_err());
        assert_eq!(metrics.admitted.load(Ordering::SeqCst), 12);
        assert_eq!(metrics.succeeded.load(Ordering::SeqCst), 11);
        assert_eq!(metrics.failed.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.queued.load(Ordering::SeqCst), 0);
    }
}
