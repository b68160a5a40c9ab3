use super::{ControllerConfig, MAX_CONCURRENCY, MIN_CONCURRENCY, resolve_threshold};

/// Direction of a single controller step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    Up,
    Down,
    Hold,
}

impl Adjustment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Adjustment::Up => "up",
            Adjustment::Down => "down",
            Adjustment::Hold => "hold",
        }
    }
}

/// Current concurrency level and the bounds it moves within.
///
/// Invariant: `1 <= min <= current <= max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConcurrencyState {
    current: usize,
    min: usize,
    max: usize,
    threshold: f64,
}

impl ConcurrencyState {
    /// Start at `max / 2`, clamped into the bounds.
    pub fn new(min: usize, max: usize, threshold: f64) -> Self {
        let min = min.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        let max = max.clamp(min, MAX_CONCURRENCY);
        Self {
            current: (max / 2).clamp(min, max),
            min,
            max,
            threshold: resolve_threshold(threshold),
        }
    }

    pub fn from_config(cfg: &ControllerConfig) -> Self {
        Self::new(cfg.min, cfg.max, cfg.threshold)
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }

    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Move one step according to the sign of `live_load - threshold`.
    ///
    /// Above the threshold the level goes up, below it goes down; equal holds. Never leaves `[min, max]`.
    pub fn step(&mut self, live_load: f64) -> Adjustment {
        if live_load > self.threshold && self.current < self.max {
            self.current += 1;
            Adjustment::Up
        } else if live_load < self.threshold && self.current > self.min {
            self.current -= 1;
            Adjustment::Down
        } else {
            Adjustment::Hold
        }
    }
}
