//! Round runner.
//!
//! Fans one probe task out per endpoint and gathers the outcomes under a
//! single collection deadline. Probes that miss the deadline are recorded as
//! failures and left to finish on their own.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::config::MonitorSettings;
use crate::probe::{ProbeError, ProbeOutcome, Prober};
use crate::region::{ActiveSet, Region};

/// All outcomes of one polling tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    /// Region whose endpoint set was probed
    pub region: Region,

    pub started_at: DateTime<Utc>,

    /// Outcomes in completion order
    pub outcomes: Vec<ProbeOutcome>,
}

impl RoundResult {
    pub fn new(region: Region, started_at: DateTime<Utc>, outcomes: Vec<ProbeOutcome>) -> Self {
        Self { region, started_at, outcomes }
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|o| o.success).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    /// Failed share of this round in percent, `None` for an empty round
    pub fn loss_percentage(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            total => Some(self.failed() as f64 * 100.0 / total as f64),
        }
    }

    /// Latencies of the successful outcomes
    pub fn latencies(&self) -> impl Iterator<Item = f64> + '_ {
        self.outcomes.iter().filter_map(|o| o.latency_ms)
    }
}

/// Runs one concurrent round of probes
pub struct RoundRunner {
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    collection_timeout: Duration,
}

impl RoundRunner {
    pub fn new(prober: Arc<dyn Prober>, probe_timeout: Duration, collection_timeout: Duration) -> Self {
        Self { prober, probe_timeout, collection_timeout }
    }

    pub fn from_settings(prober: Arc<dyn Prober>, settings: &MonitorSettings) -> Self {
        Self::new(prober, settings.probe_timeout, settings.collection_timeout)
    }

    /// Probe every endpoint of `set` concurrently
    ///
    /// The result always holds exactly one outcome per endpoint.
    pub async fn run(&self, set: &ActiveSet) -> RoundResult {
        let started_at = Utc::now();
        let deadline = Instant::now() + self.collection_timeout;
        let endpoints = &set.endpoints;

        let mut pending: FuturesUnordered<_> = endpoints
            .iter()
            .enumerate()
            .map(|(index, endpoint)| {
                let prober = Arc::clone(&self.prober);
                let endpoint = endpoint.clone();
                let probe_timeout = self.probe_timeout;
                let handle =
                    tokio::spawn(async move { prober.probe(&endpoint, probe_timeout).await });
                async move { (index, handle.await) }
            })
            .collect();

        let mut finished = vec![false; endpoints.len()];
        let mut outcomes = Vec::with_capacity(endpoints.len());

        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some((index, joined))) => {
                    finished[index] = true;
                    outcomes.push(joined.unwrap_or_else(|e| {
                        warn!(endpoint = %endpoints[index], "Probe task failed: {}", e);
                        ProbeOutcome::new(endpoints[index].as_str())
                            .failed(ProbeError::Other(e.to_string()))
                    }));
                }
                Ok(None) => break,
                Err(_) => {
                    for (index, _) in finished.iter().enumerate().filter(|(_, done)| !**done) {
                        warn!(endpoint = %endpoints[index], "Probe missed the collection deadline");
                        outcomes.push(
                            ProbeOutcome::new(endpoints[index].as_str())
                                .failed(ProbeError::CollectionTimeout),
                        );
                    }
                    break;
                }
            }
        }

        let round = RoundResult::new(set.region, started_at, outcomes);
        debug!(
            region = %round.region,
            successful = round.successful(),
            failed = round.failed(),
            "Round completed"
        );
        round
    }
}
