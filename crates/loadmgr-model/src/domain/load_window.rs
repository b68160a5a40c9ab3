use serde::{Deserialize, Serialize};

/// Sliding window over the load sample stream.
///
/// Capacities are counted in samples; with the default one-second tick they cover one, five and fifteen minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LoadWindow {
    /// Last 60 samples.
    Short,
    /// Last 300 samples.
    Medium,
    /// Last 900 samples.
    Long,
}

impl LoadWindow {
    pub const ALL: [LoadWindow; 3] = [LoadWindow::Short, LoadWindow::Medium, LoadWindow::Long];

    /// Maximum number of samples retained by the window.
    pub const fn capacity(&self) -> usize {
        match self {
            LoadWindow::Short => 60,
            LoadWindow::Medium => 300,
            LoadWindow::Long => 900,
        }
    }

    /// Short label used in logs and metrics:
    /// - `"1m"`
    /// - `"5m"`
    /// - `"15m"`
    pub fn label(&self) -> &'static str {
        match self {
            LoadWindow::Short => "1m",
            LoadWindow::Medium => "5m",
            LoadWindow::Long => "15m",
        }
    }

    /// Position inside [`LoadWindow::ALL`].
    #[inline]
    pub const fn index(&self) -> usize {
        match self {
            LoadWindow::Short => 0,
            LoadWindow::Medium => 1,
            LoadWindow::Long => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacities_are_ordered() {
        assert_eq!(LoadWindow::Short.capacity(), 60);
        assert_eq!(LoadWindow::Medium.capacity(), 300);
        assert_eq!(LoadWindow::Long.capacity(), 900);
    }

    #[test]
    fn index_matches_all() {
        for (i, w) in LoadWindow::ALL.iter().enumerate() {
            assert_eq!(w.index(), i);
        }
    }
}
