use std::fmt;

use serde::{Deserialize, Serialize};

/// Upper bound (exclusive) of the good band, in milliseconds
pub const GOOD_BELOW_MS: f64 = 50.0;

/// Upper bound (exclusive) of the warn band, in milliseconds
pub const WARN_BELOW_MS: f64 = 100.0;

/// Presentation band for a latency figure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatencyBand {
    Good,
    Warn,
    Bad,
}

impl LatencyBand {
    pub fn classify(latency_ms: f64) -> Self {
        if latency_ms < GOOD_BELOW_MS {
            LatencyBand::Good
        } else if latency_ms < WARN_BELOW_MS {
            LatencyBand::Warn
        } else {
            LatencyBand::Bad
        }
    }
}

impl fmt::Display for LatencyBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencyBand::Good => write!(f, "good"),
            LatencyBand::Warn => write!(f, "warn"),
            LatencyBand::Bad => write!(f, "bad"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_thresholds() {
        assert_eq!(LatencyBand::classify(0.0), LatencyBand::Good);
        assert_eq!(LatencyBand::classify(49.9), LatencyBand::Good);
        assert_eq!(LatencyBand::classify(50.0), LatencyBand::Warn);
        assert_eq!(LatencyBand::classify(99.9), LatencyBand::Warn);
        assert_eq!(LatencyBand::classify(100.0), LatencyBand::Bad);
    }
}
