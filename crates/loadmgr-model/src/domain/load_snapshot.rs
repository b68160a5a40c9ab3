use serde::{Deserialize, Serialize};

/// One published controller observation.
///
/// Averages are computed over whatever the windows currently hold; `samples` tells how many observations the controller has recorded so far, so callers that want full windows can check `samples >= LoadWindow::Long.capacity()`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSnapshot {
    /// Concurrency level the executor should admit up to.
    pub concurrency: usize,
    /// Load score of the latest sample, in `[0, 100]`.
    pub live_load: f64,
    /// Mean over the short window.
    pub avg_1m: f64,
    /// Mean over the medium window.
    pub avg_5m: f64,
    /// Mean over the long window.
    pub avg_15m: f64,
    /// Number of samples recorded since the controller started.
    pub samples: u64,
}

impl LoadSnapshot {
    /// Snapshot published before any sample has been observed.
    pub fn initial(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_has_no_load() {
        let s = LoadSnapshot::initial(5);
        assert_eq!(s.concurrency, 5);
        assert_eq!(s.samples, 0);
        assert_eq!(s.live_load, 0.0);
    }

    #[test]
    fn serde_uses_camel_case() {
        let s = LoadSnapshot {
            concurrency: 3,
            live_load: 42.5,
            avg_1m: 40.0,
            avg_5m: 30.0,
            avg_15m: 20.0,
            samples: 7,
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"liveLoad\":42.5"));
        assert!(json.contains("\"avg15m\":20.0"));

        let back: LoadSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
