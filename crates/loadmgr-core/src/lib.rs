//! # loadmgr-core
//!
//! Bounded parallel execution with an optional host-load feedback loop.
//!
//! - [`load`] samples host CPU and memory and keeps rolling 1m/5m/15m windows.
//! - [`controller`] turns live load into a concurrency limit, one step per tick.
//! - [`executor`] runs a worker over a batch of items under a fixed or controller-driven limit.
//! - [`context`] carries cancellation and request metadata into workers.
//! - [`metrics`] is the seam for instrumentation backends.
pub mod context;
pub use context::RunContext;

pub mod controller;
pub use controller::{
    Adjustment, ConcurrencyController, ConcurrencyState, ControllerConfig, DEFAULT_MAX_CONCURRENCY,
    DEFAULT_THRESHOLD, DEFAULT_TICK, LoadController, MAX_CONCURRENCY, MIN_CONCURRENCY,
    adjust_concurrency,
};

pub mod error;
pub use error::{ContextError, RunError};

pub mod executor;
pub use executor::{BoundedExecutor, DEFAULT_INITIAL_LIMIT, run_adaptive, run_bounded};

pub mod load;
pub use load::{
    LoadHistory, LoadSource, StaticLoad, SystemLoadSampler, combine_load, sample_load,
};

pub mod metrics;
pub use metrics::{MetricsBackend, MetricsHandle, NoopMetrics};

pub use loadmgr_model::{KeyValue, LoadSnapshot, LoadWindow, Metadata, TaskOutcome};
