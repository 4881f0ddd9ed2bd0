//! Latency statistics over bounded histories.

pub mod aggregator;
pub mod band;
pub mod history;

pub use aggregator::{StatsAggregator, StatsSnapshot};
pub use band::LatencyBand;
pub use history::BoundedHistory;

/// Round to one decimal place for display
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
