use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::band::LatencyBand;
use super::history::BoundedHistory;
use super::round1;
use crate::config::MonitorSettings;
use crate::round::RoundResult;

/// Read-only view of the aggregated statistics
///
/// Latency, jitter and loss figures are rounded to one decimal place.
/// Figures with no underlying samples are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub total_tests: u64,
    pub successful_tests: u64,
    pub failed_tests: u64,

    /// Mean latency of the latest round's successful probes
    pub current_latency_ms: f64,

    /// Lifetime minimum latency
    pub min_latency_ms: f64,

    /// Lifetime maximum latency
    pub max_latency_ms: f64,

    /// Mean over the whole latency history
    pub average_latency_ms: f64,

    /// Mean over the newest latencies
    pub recent_average_ms: f64,

    /// Sample standard deviation over the newest latencies
    pub jitter_ms: f64,

    /// Mean of the per-round loss history
    pub packet_loss_pct: f64,

    pub uptime_secs: u64,

    /// Number of latencies currently held in history
    pub samples: usize,
}

impl StatsSnapshot {
    pub fn uptime(&self) -> Duration {
        Duration::from_secs(self.uptime_secs)
    }

    /// Uptime as `HH:MM:SS`
    pub fn uptime_display(&self) -> String {
        let secs = self.uptime_secs;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }

    /// Band of the recent average, if any latency has been recorded
    pub fn band(&self) -> Option<LatencyBand> {
        (self.samples > 0).then(|| LatencyBand::classify(self.recent_average_ms))
    }
}

/// Folds round results into bounded histories and lifetime counters
#[derive(Debug, Clone)]
pub struct StatsAggregator {
    latencies: BoundedHistory<f64>,
    losses: BoundedHistory<f64>,
    recent_window: usize,
    total_tests: u64,
    successful_tests: u64,
    failed_tests: u64,
    min_latency: Option<f64>,
    max_latency: Option<f64>,
    last_round_average: Option<f64>,
    /// Uptime of runs that have already stopped
    accumulated_uptime: Duration,
    running_since: Option<Instant>,
}

impl StatsAggregator {
    pub fn new(latency_capacity: usize, loss_capacity: usize, recent_window: usize) -> Self {
        Self {
            latencies: BoundedHistory::new(latency_capacity),
            losses: BoundedHistory::new(loss_capacity),
            recent_window: recent_window.max(1),
            total_tests: 0,
            successful_tests: 0,
            failed_tests: 0,
            min_latency: None,
            max_latency: None,
            last_round_average: None,
            accumulated_uptime: Duration::ZERO,
            running_since: None,
        }
    }

    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self::new(settings.latency_capacity, settings.loss_capacity, settings.recent_window)
    }

    /// Start (or resume) the uptime clock
    pub fn mark_started(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }

    /// Freeze the uptime clock, keeping what has accumulated so far
    pub fn mark_stopped(&mut self) {
        if let Some(since) = self.running_since.take() {
            self.accumulated_uptime += since.elapsed();
        }
    }

    /// Fold one round into the statistics
    pub fn update(&mut self, round: &RoundResult) {
        let mut round_sum = 0.0;
        let mut round_count = 0usize;

        for latency in round.latencies() {
            self.latencies.push(latency);
            self.min_latency = Some(self.min_latency.map_or(latency, |min| min.min(latency)));
            self.max_latency = Some(self.max_latency.map_or(latency, |max| max.max(latency)));
            round_sum += latency;
            round_count += 1;
        }

        if let Some(loss) = round.loss_percentage() {
            self.losses.push(loss);
        }

        self.total_tests += round.total() as u64;
        self.successful_tests += round.successful() as u64;
        self.failed_tests += round.failed() as u64;
        self.last_round_average = (round_count > 0).then(|| round_sum / round_count as f64);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let recent: Vec<f64> = self.latencies.recent(self.recent_window).copied().collect();

        StatsSnapshot {
            total_tests: self.total_tests,
            successful_tests: self.successful_tests,
            failed_tests: self.failed_tests,
            current_latency_ms: round1(self.last_round_average.unwrap_or(0.0)),
            min_latency_ms: round1(self.min_latency.unwrap_or(0.0)),
            max_latency_ms: round1(self.max_latency.unwrap_or(0.0)),
            average_latency_ms: round1(mean(self.latencies.iter().copied())),
            recent_average_ms: round1(mean(recent.iter().copied())),
            jitter_ms: round1(sample_std_dev(&recent)),
            packet_loss_pct: round1(mean(self.losses.iter().copied())),
            uptime_secs: self.uptime().as_secs(),
            samples: self.latencies.len(),
        }
    }

    /// Time spent running, summed across restarts
    pub fn uptime(&self) -> Duration {
        self.accumulated_uptime + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }

    /// Unrounded latency history, oldest first
    pub fn latency_history(&self) -> Vec<f64> {
        self.latencies.to_vec()
    }

    /// Unrounded per-round loss history, oldest first
    pub fn loss_history(&self) -> Vec<f64> {
        self.losses.to_vec()
    }
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}

fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values.iter().copied());
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
