use std::collections::VecDeque;

use loadmgr_model::LoadWindow;

use super::clamp_percent;

/// Three sliding windows over one load sample stream.
///
/// Every recorded sample lands in all windows at once; each window drops its oldest sample once it is full.
#[derive(Debug, Clone)]
pub struct LoadHistory {
    windows: [VecDeque<f64>; 3],
    recorded: u64,
}

impl LoadHistory {
    pub fn new() -> Self {
        Self {
            windows: LoadWindow::ALL.map(|w| VecDeque::with_capacity(w.capacity())),
            recorded: 0,
        }
    }

    /// Append a sample to every window, evicting the oldest entries past capacity.
    pub fn record(&mut self, sample: f64) {
        let sample = clamp_percent(sample);
        for window in LoadWindow::ALL {
            let buf = &mut self.windows[window.index()];
            while buf.len() >= window.capacity() {
                buf.pop_front();
            }
            buf.push_back(sample);
        }
        self.recorded += 1;
    }

    /// Arithmetic mean of the window, `0.0` when empty.
    pub fn average(&self, window: LoadWindow) -> f64 {
        let buf = &self.windows[window.index()];
        if buf.is_empty() {
            return 0.0;
        }
        buf.iter().sum::<f64>() / buf.len() as f64
    }

    pub fn len(&self, window: LoadWindow) -> usize {
        self.windows[window.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.recorded == 0
    }

    /// Returns `true` once the window holds `capacity` samples.
    pub fn is_full(&self, window: LoadWindow) -> bool {
        self.len(window) == window.capacity()
    }

    /// Samples currently held by the window, oldest first.
    pub fn samples(&self, window: LoadWindow) -> impl Iterator<Item = f64> + '_ {
        self.windows[window.index()].iter().copied()
    }

    /// Total number of samples recorded, including evicted ones.
    #[inline]
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

impl Default for LoadHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_history_averages_zero() {
        let h = LoadHistory::new();
        assert!(h.is_empty());
        for w in LoadWindow::ALL {
            assert_eq!(h.average(w), 0.0);
            assert_eq!(h.len(w), 0);
        }
    }

    #[test]
    fn record_updates_all_windows() {
        let mut h = LoadHistory::new();
        h.record(10.0);
        h.record(30.0);

        for w in LoadWindow::ALL {
            assert_eq!(h.len(w), 2);
            assert_eq!(h.average(w), 20.0);
        }
        assert_eq!(h.recorded(), 2);
    }

    #[test]
    fn short_window_evicts_oldest_first() {
        let mut h = LoadHistory::new();
        for i in 0..=60 {
            h.record(i as f64);
        }

        assert_eq!(h.len(LoadWindow::Short), 60);
        assert!(h.is_full(LoadWindow::Short));
        let kept: Vec<f64> = h.samples(LoadWindow::Short).collect();
        assert_eq!(kept.first(), Some(&1.0));
        assert_eq!(kept.last(), Some(&60.0));

        // Longer windows still hold the evicted sample.
        assert_eq!(h.len(LoadWindow::Medium), 61);
        assert_eq!(h.samples(LoadWindow::Medium).next(), Some(0.0));
    }

    #[test]
    fn windows_never_exceed_capacity() {
        let mut h = LoadHistory::new();
        for i in 0..1000 {
            h.record((i % 101) as f64);
        }
        for w in LoadWindow::ALL {
            assert_eq!(h.len(w), w.capacity());
            let avg = h.average(w);
            assert!((0.0..=100.0).contains(&avg));
        }
        assert_eq!(h.recorded(), 1000);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let mut h = LoadHistory::new();
        h.record(500.0);
        h.record(-5.0);
        h.record(f64::NAN);
        let kept: Vec<f64> = h.samples(LoadWindow::Short).collect();
        assert_eq!(kept, vec![100.0, 0.0, 0.0]);
    }
}
