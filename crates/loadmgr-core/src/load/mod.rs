//! Host load sampling.
//!
//! A load score blends CPU and memory utilization into one number in `[0, 100]`:
//! `cpu * 0.7 + mem * 0.3`.
//! Sampling never fails; a reading that cannot be taken counts as zero utilization for that component.

mod history;
pub use history::LoadHistory;

use std::time::Duration;

use async_trait::async_trait;
use sysinfo::{CpuExt, System, SystemExt};
use tracing::trace;

/// Weight of CPU utilization in the combined score.
pub const CPU_WEIGHT: f64 = 0.7;
/// Weight of memory utilization in the combined score.
pub const MEM_WEIGHT: f64 = 0.3;

/// Default CPU observation window.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

// sysinfo needs a gap between two CPU refreshes to report anything meaningful.
const MIN_SAMPLE_INTERVAL: Duration = Duration::from_millis(200);

/// Source of load samples consumed by the controller.
#[async_trait]
pub trait LoadSource: Send {
    /// Take one sample in `[0, 100]`. May suspend for a sampling interval.
    async fn sample(&mut self) -> f64;
}

/// Combine CPU and memory utilization percentages into a load score.
pub fn combine_load(cpu_percent: f64, mem_percent: f64) -> f64 {
    (clamp_percent(cpu_percent) * CPU_WEIGHT + clamp_percent(mem_percent) * MEM_WEIGHT)
        .clamp(0.0, 100.0)
}

/// Clamp a percentage into `[0, 100]`; NaN and infinities count as zero.
#[inline]
pub(crate) fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Sample the host once with a fresh [`SystemLoadSampler`].
///
/// Suspends for [`DEFAULT_SAMPLE_INTERVAL`].
pub async fn sample_load() -> f64 {
    SystemLoadSampler::new().sample().await
}

/// Load source backed by `sysinfo`.
pub struct SystemLoadSampler {
    sys: System,
    interval: Duration,
}

impl SystemLoadSampler {
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_SAMPLE_INTERVAL)
    }

    /// Use a custom CPU observation window (floored at 200ms).
    pub fn with_interval(interval: Duration) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu();
        sys.refresh_memory();
        Self {
            sys,
            interval: interval.max(MIN_SAMPLE_INTERVAL),
        }
    }

    #[inline]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn memory_percent(&mut self) -> f64 {
        self.sys.refresh_memory();
        let total = self.sys.total_memory();
        if total == 0 {
            return 0.0;
        }
        self.sys.used_memory() as f64 / total as f64 * 100.0
    }

    fn cpu_percent(&self) -> f64 {
        self.sys.global_cpu_info().cpu_usage() as f64
    }
}

impl Default for SystemLoadSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoadSource for SystemLoadSampler {
    async fn sample(&mut self) -> f64 {
        self.sys.refresh_cpu();
        tokio::time::sleep(self.interval).await;
        self.sys.refresh_cpu();

        let cpu = clamp_percent(self.cpu_percent());
        let mem = clamp_percent(self.memory_percent());
        let load = combine_load(cpu, mem);

        trace!(target: "loadmgr::load", cpu, mem, load, "host load sampled");
        load
    }
}

/// Load source that always reports the same value.
///
/// Handy for pinning the controller in tests, or for feeding it an externally computed score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticLoad(f64);

impl StaticLoad {
    pub fn new(load: f64) -> Self {
        Self(clamp_percent(load))
    }

    #[inline]
    pub fn load(&self) -> f64 {
        self.0
    }
}

#[async_trait]
impl LoadSource for StaticLoad {
    async fn sample(&mut self) -> f64 {
        self.0
    }
}
