use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::round::RoundResult;
use crate::stats::StatsSnapshot;

/// One round together with the statistics it produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: RoundResult,
    pub stats: StatsSnapshot,
}

/// Receives one report per round, in round order
///
/// Called from the monitor loop's own task. An error is logged by the loop
/// and does not stop monitoring.
#[async_trait::async_trait]
pub trait RoundObserver: Send + Sync {
    async fn on_round(&self, report: &RoundReport) -> Result<()>;
}

/// Forwards reports into a channel drained by another task
pub struct ChannelObserver {
    tx: mpsc::Sender<RoundReport>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::Sender<RoundReport>) -> Self {
        Self { tx }
    }

    /// Create an observer and the receiver for its reports
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RoundReport>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait::async_trait]
impl RoundObserver for ChannelObserver {
    async fn on_round(&self, report: &RoundReport) -> Result<()> {
        self.tx
            .send(report.clone())
            .await
            .map_err(|_| anyhow!("Report receiver has been dropped"))
    }
}

/// Prints a formatted report to stdout
///
/// Used by the monitor when no observer is registered.
pub struct ConsoleReporter {
    interval: Duration,
}

impl ConsoleReporter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn render(&self, report: &RoundReport) -> String {
        let mut out = String::new();
        let stats = &report.stats;

        let _ = writeln!(out, "\n{:=^60}", " HTTP Ping Test ");
        let _ = writeln!(
            out,
            "Testing at {} [{}]\n",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            report.round.region
        );

        for outcome in &report.round.outcomes {
            match (&outcome.error, outcome.latency_ms) {
                (None, Some(latency)) => {
                    let _ = writeln!(
                        out,
                        "{:50.50} | {:6.1} ms | HTTP {}",
                        outcome.endpoint,
                        latency,
                        outcome.status_code.unwrap_or_default()
                    );
                }
                (error, _) => {
                    let reason = error.as_ref().map(|e| e.to_string()).unwrap_or_default();
                    let _ = writeln!(out, "X {:50.50} | ERROR: {}", outcome.endpoint, reason);
                }
            }
        }

        let _ = writeln!(
            out,
            "\nAvg {:.1} ms | Jitter {:.1} ms | Loss {:.1}% | Min {:.1} / Max {:.1} ms | Uptime {}",
            stats.recent_average_ms,
            stats.jitter_ms,
            stats.packet_loss_pct,
            stats.min_latency_ms,
            stats.max_latency_ms,
            stats.uptime_display()
        );
        let _ = write!(out, "\nNext test in {} seconds...", self.interval.as_secs_f64());
        out
    }
}

#[async_trait::async_trait]
impl RoundObserver for ConsoleReporter {
    async fn on_round(&self, report: &RoundReport) -> Result<()> {
        println!("{}", self.render(report));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeError, ProbeOutcome};
    use crate::region::Region;
    use chrono::Utc;

    fn report() -> RoundReport {
        let outcomes = vec![
            ProbeOutcome::new("https://ok.example").succeeded(52.34, 200),
            ProbeOutcome::new("https://down.example").failed(ProbeError::ConnectionFailed),
        ];
        RoundReport {
            round: RoundResult::new(Region::Euw, Utc::now(), outcomes),
            stats: StatsSnapshot { recent_average_ms: 52.3, packet_loss_pct: 50.0, ..Default::default() },
        }
    }

    #[test]
    fn test_console_render() {
        let rendered = ConsoleReporter::new(Duration::from_secs(2)).render(&report());

        assert!(rendered.contains(" HTTP Ping Test "));
        assert!(rendered.contains("[EUW]"));
        assert!(rendered.contains("https://ok.example"));
        assert!(rendered.contains("52.3 ms | HTTP 200"));
        assert!(rendered.contains("X https://down.example"));
        assert!(rendered.contains("ERROR: Connection failed"));
        assert!(rendered.contains("Loss 50.0%"));
        assert!(rendered.ends_with("Next test in 2 seconds..."));
    }

    #[tokio::test]
    async fn test_channel_observer_delivers_and_reports_closed() {
        let (observer, mut rx) = ChannelObserver::channel(4);
        let report = report();

        observer.on_round(&report).await.unwrap();
        assert_eq!(rx.recv().await, Some(report.clone()));

        drop(rx);
        assert!(observer.on_round(&report).await.is_err());
    }
}
