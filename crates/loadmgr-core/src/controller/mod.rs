//! Load-driven concurrency controller.
//!
//! ## Cycle
//! `Sampling -> Adjusting -> Publishing`, once per tick:
//! - **Sampling**: take one load sample and record it into the [`LoadHistory`].
//! - **Adjusting**: move the concurrency level one step toward the sign of `live - threshold` (see [`ConcurrencyState::step`]).
//! - **Publishing**: hand a [`LoadSnapshot`] to readers.
//!
//! ## Ownership
//! [`LoadController`] owns the history and the state exclusively.
//! [`ConcurrencyController`] moves it into a background task and publishes snapshots through a `watch` channel, so readers never wait for a tick and never touch the mutable state.
mod state;
pub use state::{Adjustment, ConcurrencyState};

use std::time::Duration;

use loadmgr_model::{LoadSnapshot, LoadWindow};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    load::{DEFAULT_SAMPLE_INTERVAL, LoadHistory, LoadSource, SystemLoadSampler, clamp_percent},
    metrics::{MetricsHandle, noop},
};

/// Threshold used when the caller passes `0` (or any non-positive value).
pub const DEFAULT_THRESHOLD: f64 = 80.0;
/// Lowest concurrency level the controller or the executor will ever use.
pub const MIN_CONCURRENCY: usize = 1;
/// Highest concurrency level representable by the admission gate.
pub const MAX_CONCURRENCY: usize = tokio::sync::Semaphore::MAX_PERMITS;
/// Default ceiling for a standalone controller.
pub const DEFAULT_MAX_CONCURRENCY: usize = 100;
/// Default controller period.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

const MIN_TICK: Duration = Duration::from_millis(1);

/// Controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Lower bound for the concurrency level (at least 1).
    pub min: usize,
    /// Upper bound for the concurrency level.
    pub max: usize,
    /// Load score above which the level steps up and below which it steps down.
    pub threshold: f64,
    /// Period between two cycles.
    pub tick: Duration,
    /// CPU observation window used by the system sampler.
    pub sample_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            min: MIN_CONCURRENCY,
            max: DEFAULT_MAX_CONCURRENCY,
            threshold: DEFAULT_THRESHOLD,
            tick: DEFAULT_TICK,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl ControllerConfig {
    /// Config bounded by `max`; a `threshold` of `0` selects [`DEFAULT_THRESHOLD`].
    pub fn new(max: usize, threshold: f64) -> Self {
        Self {
            max,
            threshold,
            ..Default::default()
        }
        .normalized()
    }

    pub fn with_min(mut self, min: usize) -> Self {
        self.min = min;
        self.normalized()
    }

    /// Period between two cycles (floored at 1ms).
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self.normalized()
    }

    pub fn with_sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    /// Enforce `1 <= min <= max`, a non-zero tick, and replace a missing threshold with the default.
    pub fn normalized(mut self) -> Self {
        self.tick = self.tick.max(MIN_TICK);
        self.min = self.min.max(MIN_CONCURRENCY);
        self.min = self.min.min(MAX_CONCURRENCY);
        self.max = self.max.clamp(self.min, MAX_CONCURRENCY);
        self.threshold = resolve_threshold(self.threshold);
        self
    }
}

#[inline]
pub(crate) fn resolve_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() && threshold > 0.0 {
        threshold
    } else {
        DEFAULT_THRESHOLD
    }
}

/// Controller state machine driven by the caller, one [`LoadController::observe`] per cycle.
pub struct LoadController<S> {
    source: S,
    history: LoadHistory,
    state: ConcurrencyState,
    last: LoadSnapshot,
    tick: Duration,
    metrics: MetricsHandle,
}

impl<S: LoadSource> LoadController<S> {
    pub fn new(cfg: &ControllerConfig, source: S) -> Self {
        let cfg = cfg.clone().normalized();
        let state = ConcurrencyState::from_config(&cfg);
        Self {
            source,
            history: LoadHistory::new(),
            last: LoadSnapshot::initial(state.current()),
            state,
            tick: cfg.tick,
            metrics: noop(),
        }
    }

    pub fn with_metrics(mut self, metrics: MetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    #[inline]
    pub fn state(&self) -> ConcurrencyState {
        self.state
    }

    #[inline]
    pub fn history(&self) -> &LoadHistory {
        &self.history
    }

    #[inline]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Last published snapshot; does not sample.
    #[inline]
    pub fn snapshot(&self) -> LoadSnapshot {
        self.last
    }

    /// Run one full cycle and return the published snapshot.
    pub async fn observe(&mut self) -> LoadSnapshot {
        let live_load = clamp_percent(self.source.sample().await);
        self.history.record(live_load);

        let before = self.state.current();
        let adjustment = self.state.step(live_load);

        let snapshot = LoadSnapshot {
            concurrency: self.state.current(),
            live_load,
            avg_1m: self.history.average(LoadWindow::Short),
            avg_5m: self.history.average(LoadWindow::Medium),
            avg_15m: self.history.average(LoadWindow::Long),
            samples: self.history.recorded(),
        };

        if adjustment == Adjustment::Hold {
            trace!(
                target: "loadmgr::controller",
                concurrency = snapshot.concurrency,
                live_load,
                "concurrency held"
            );
        } else {
            debug!(
                target: "loadmgr::controller",
                from = before,
                to = snapshot.concurrency,
                direction = adjustment.as_str(),
                live_load,
                threshold = self.state.threshold(),
                avg_1m = snapshot.avg_1m,
                "concurrency adjusted"
            );
        }

        self.metrics.concurrency_adjusted(&snapshot);
        self.last = snapshot;
        snapshot
    }
}

/// One observation against the host, starting from `max / 2`.
///
/// A `threshold` of `0` selects [`DEFAULT_THRESHOLD`]. Suspends for one sampling interval.
/// Averages cover the single sample taken; use a [`ConcurrencyController`] to accumulate history.
pub async fn adjust_concurrency(max_concurrency: usize, threshold: f64) -> LoadSnapshot {
    let cfg = ControllerConfig::new(max_concurrency, threshold);
    let sampler = SystemLoadSampler::with_interval(cfg.sample_interval);
    LoadController::new(&cfg, sampler).observe().await
}

/// Background controller publishing a [`LoadSnapshot`] every tick.
///
/// The loop stops on [`ConcurrencyController::shutdown`] or when the handle is dropped.
pub struct ConcurrencyController {
    token: CancellationToken,
    rx: watch::Receiver<LoadSnapshot>,
    join: Option<JoinHandle<()>>,
}

impl ConcurrencyController {
    /// Spawn a controller over `source`. Must be called within a tokio runtime.
    pub fn start<S>(cfg: &ControllerConfig, source: S) -> Self
    where
        S: LoadSource + 'static,
    {
        Self::spawn(LoadController::new(cfg, source))
    }

    /// Spawn an already configured [`LoadController`]. Must be called within a tokio runtime.
    pub fn spawn<S>(controller: LoadController<S>) -> Self
    where
        S: LoadSource + 'static,
    {
        let (tx, rx) = watch::channel(controller.snapshot());
        let token = CancellationToken::new();
        let join = tokio::spawn(drive(controller, tx, token.clone()));
        Self {
            token,
            rx,
            join: Some(join),
        }
    }

    /// Most recently published snapshot.
    pub fn snapshot(&self) -> LoadSnapshot {
        *self.rx.borrow()
    }

    /// Most recently published concurrency level.
    pub fn concurrency(&self) -> usize {
        self.rx.borrow().concurrency
    }

    /// Receiver notified on every publish.
    pub fn subscribe(&self) -> watch::Receiver<LoadSnapshot> {
        self.rx.clone()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let Some(join) = self.join.take() else {
            return;
        };
        if let Err(e) = join.await {
            warn!(
                target: "loadmgr::controller",
                error = %e,
                panicked = e.is_panic(),
                "controller task ended abnormally"
            );
        }
    }
}

impl Drop for ConcurrencyController {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn drive<S: LoadSource>(
    mut controller: LoadController<S>,
    tx: watch::Sender<LoadSnapshot>,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(controller.tick());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(target: "loadmgr::controller", state = ?controller.state(), "controller started");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let snapshot = tokio::select! {
            _ = token.cancelled() => break,
            snapshot = controller.observe() => snapshot,
        };
        tx.send_replace(snapshot);
    }
    debug!(target: "loadmgr::controller", "controller stopped");
}
