//! Monitor configuration.
//!
//! Timing and capacity knobs for the probe, round and aggregation layers.

use std::path::PathBuf;
use std::time::Duration;

use crate::{LATENCY_HISTORY_CAPACITY, LOSS_HISTORY_CAPACITY, RECENT_WINDOW};

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default bound on collecting a whole round
pub const DEFAULT_COLLECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default bound on waiting for the loop task to exit after a stop
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// User agent sent with every probe
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

/// Settings for a [`crate::Monitor`] and the components it drives
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Timeout applied to each individual probe request
    pub probe_timeout: Duration,

    /// Upper bound on how long a round waits for its probes
    pub collection_timeout: Duration,

    /// Upper bound on how long `stop` waits for the loop task
    pub join_timeout: Duration,

    /// Capacity of the latency history
    pub latency_capacity: usize,

    /// Capacity of the per-round loss history
    pub loss_capacity: usize,

    /// Number of newest latencies used for recent average and jitter
    pub recent_window: usize,

    /// Whether a successful HEAD is followed by a timed GET
    pub content_read: bool,

    /// User agent header for probe requests
    pub user_agent: String,

    /// Directory used for exports without an explicit destination
    pub export_dir: PathBuf,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            collection_timeout: DEFAULT_COLLECTION_TIMEOUT,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
            latency_capacity: LATENCY_HISTORY_CAPACITY,
            loss_capacity: LOSS_HISTORY_CAPACITY,
            recent_window: RECENT_WINDOW,
            content_read: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            export_dir: PathBuf::from("."),
        }
    }
}

impl MonitorSettings {
    /// Create a new settings builder
    pub fn builder() -> MonitorSettingsBuilder {
        MonitorSettingsBuilder::default()
    }
}

/// Builder for MonitorSettings
#[derive(Default)]
pub struct MonitorSettingsBuilder {
    settings: MonitorSettings,
}

impl MonitorSettingsBuilder {
    /// Build the settings
    pub fn build(self) -> MonitorSettings {
        self.settings
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.settings.probe_timeout = timeout;
        self
    }

    pub fn collection_timeout(mut self, timeout: Duration) -> Self {
        self.settings.collection_timeout = timeout;
        self
    }

    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.settings.join_timeout = timeout;
        self
    }

    /// Enable or disable the follow-up content read
    pub fn content_read(mut self, enable: bool) -> Self {
        self.settings.content_read = enable;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.settings.user_agent = user_agent.into();
        self
    }

    pub fn export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.export_dir = dir.into();
        self
    }

    /// Set history capacities (latencies, per-round losses)
    pub fn history_capacities(mut self, latency: usize, loss: usize) -> Self {
        self.settings.latency_capacity = latency.max(1);
        self.settings.loss_capacity = loss.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = MonitorSettings::default();
        assert_eq!(settings.probe_timeout, Duration::from_secs(3));
        assert_eq!(settings.collection_timeout, Duration::from_secs(10));
        assert_eq!(settings.latency_capacity, 100);
        assert_eq!(settings.loss_capacity, 20);
        assert_eq!(settings.recent_window, 10);
        assert!(settings.content_read);
    }

    #[test]
    fn test_builder_clamps_capacities() {
        let settings = MonitorSettings::builder()
            .history_capacities(0, 0)
            .content_read(false)
            .build();
        assert_eq!(settings.latency_capacity, 1);
        assert_eq!(settings.loss_capacity, 1);
        assert!(!settings.content_read);
    }
}
