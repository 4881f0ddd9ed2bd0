//! pingwatch - region-aware HTTP latency monitoring
//!
//! This library periodically probes a set of HTTP endpoints, aggregates
//! latency and loss figures over bounded windows and hands each round to an
//! observer (or prints it to the console).

pub mod config;
pub mod error;
pub mod export;
pub mod monitor;
pub mod priority;
pub mod probe;
pub mod region;
pub mod round;
pub mod stats;

// Re-export main types
pub use config::MonitorSettings;
pub use error::{ExportError, MonitorError, RegistryError};
pub use export::{ExportRecord, Exporter};
pub use monitor::{ChannelObserver, ConsoleReporter, Monitor, RoundObserver, RoundReport};
pub use priority::{CommandPriority, NetworkPriority, NoopPriority, RetryingPriority};
pub use probe::{HttpProber, ProbeError, ProbeOutcome, Prober};
pub use region::{Region, RegionRegistry};
pub use round::{RoundResult, RoundRunner};
pub use stats::{BoundedHistory, LatencyBand, StatsAggregator, StatsSnapshot};

/// Result type used by the application-facing parts of the crate
pub type Result<T> = anyhow::Result<T>;

/// Number of individual latencies kept for averages and jitter
pub const LATENCY_HISTORY_CAPACITY: usize = 100;

/// Number of per-round loss percentages kept for the loss rate
pub const LOSS_HISTORY_CAPACITY: usize = 20;

/// Number of newest latencies used for the recent average and jitter
pub const RECENT_WINDOW: usize = 10;
