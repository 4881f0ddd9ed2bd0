/// Monitor loop - owns the polling lifecycle
///
/// The monitor is either idle or running a background task that:
/// - Runs one round against the active region every interval
/// - Folds each round into the shared statistics
/// - Hands (round, stats) to the registered observer, or the console
pub mod observer;

pub use observer::{ChannelObserver, ConsoleReporter, RoundObserver, RoundReport};

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use anyhow::Result;
use futures::FutureExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::MonitorSettings;
use crate::error::{ExportError, MonitorError};
use crate::export::Exporter;
use crate::probe::{HttpProber, Prober};
use crate::region::{Region, RegionRegistry};
use crate::round::RoundRunner;
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Handle to the running loop task
struct LoopHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Everything one monitoring cycle needs, shared with the loop task
#[derive(Clone)]
struct Cycle {
    registry: Arc<RegionRegistry>,
    runner: Arc<RoundRunner>,
    stats: Arc<RwLock<StatsAggregator>>,
    observer: Arc<dyn RoundObserver>,
}

impl Cycle {
    async fn run(&self) -> Result<()> {
        // Captured once so a region switch only affects the next round
        let set = self.registry.active();
        let round = self.runner.run(&set).await;

        let stats = {
            let mut aggregator = self.stats.write().unwrap_or_else(PoisonError::into_inner);
            aggregator.update(&round);
            aggregator.snapshot()
        };

        let report = RoundReport { round, stats };
        self.observer.on_round(&report).await
    }
}

/// Latency monitor
pub struct Monitor {
    settings: MonitorSettings,
    registry: Arc<RegionRegistry>,
    runner: Arc<RoundRunner>,
    stats: Arc<RwLock<StatsAggregator>>,
    observer: Option<Arc<dyn RoundObserver>>,
    running: Mutex<Option<LoopHandle>>,
}

impl Monitor {
    /// Create a monitor probing over HTTP
    pub fn new(settings: MonitorSettings, registry: RegionRegistry) -> Result<Self> {
        let prober = Arc::new(HttpProber::from_settings(&settings)?);
        Ok(Self::with_prober(settings, registry, prober))
    }

    /// Create a monitor over any prober implementation
    pub fn with_prober(
        settings: MonitorSettings,
        registry: RegionRegistry,
        prober: Arc<dyn Prober>,
    ) -> Self {
        let runner = Arc::new(RoundRunner::from_settings(prober, &settings));
        let stats = Arc::new(RwLock::new(StatsAggregator::from_settings(&settings)));

        Self {
            settings,
            registry: Arc::new(registry),
            runner,
            stats,
            observer: None,
            running: Mutex::new(None),
        }
    }

    /// Register the observer that receives every round
    pub fn with_observer(mut self, observer: Arc<dyn RoundObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Start polling every `interval` on a background task
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<(), MonitorError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            warn!("Monitoring is already active");
            return Err(MonitorError::AlreadyActive);
        }

        self.stats.write().unwrap_or_else(PoisonError::into_inner).mark_started();

        let observer: Arc<dyn RoundObserver> = match &self.observer {
            Some(observer) => Arc::clone(observer),
            None => Arc::new(ConsoleReporter::new(interval)),
        };
        let cycle = Cycle {
            registry: Arc::clone(&self.registry),
            runner: Arc::clone(&self.runner),
            stats: Arc::clone(&self.stats),
            observer,
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(cycle, interval, stop_rx));
        *running = Some(LoopHandle { stop_tx, task });

        info!(
            region = %self.registry.active_region(),
            interval_ms = interval.as_millis() as u64,
            "Monitoring started"
        );
        Ok(())
    }

    /// Stop the loop and wait (bounded) for it to exit
    ///
    /// Returns false if the monitor was idle.
    pub async fn stop(&self) -> bool {
        let handle = self.running.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(handle) = handle else {
            debug!("Stop requested while idle");
            return false;
        };

        let _ = handle.stop_tx.send(true);
        self.stats.write().unwrap_or_else(PoisonError::into_inner).mark_stopped();

        match tokio::time::timeout(self.settings.join_timeout, handle.task).await {
            Ok(Ok(())) => info!("Monitoring stopped"),
            Ok(Err(e)) => warn!("Monitoring loop ended abnormally: {}", e),
            Err(_) => warn!(
                "Monitoring loop did not exit within {:?}, detaching it",
                self.settings.join_timeout
            ),
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.running.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Current statistics
    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.read().unwrap_or_else(PoisonError::into_inner).snapshot()
    }

    /// Unrounded latency history, oldest first
    pub fn latency_history(&self) -> Vec<f64> {
        self.stats.read().unwrap_or_else(PoisonError::into_inner).latency_history()
    }

    /// Switch region; takes effect from the next round
    pub fn set_region(&self, id: &str) -> bool {
        self.registry.set_region(id)
    }

    pub fn available_regions(&self) -> Vec<Region> {
        self.registry.available_regions()
    }

    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    /// Write a snapshot of the current state
    ///
    /// With no `target` the file goes to the configured export directory
    /// under a name embedding region and export time.
    pub fn export(&self, target: Option<&Path>) -> Result<PathBuf, ExportError> {
        let record = {
            let stats = self.stats.read().unwrap_or_else(PoisonError::into_inner);
            Exporter::capture(&self.registry, &stats)
        };
        Exporter::new(&self.settings.export_dir).write(&record, target)
    }
}

/// Resolves once a stop has been requested or the monitor is gone
async fn stop_requested(stop_rx: &mut watch::Receiver<bool>) {
    let _ = stop_rx.wait_for(|stop| *stop).await;
}

async fn run_loop(cycle: Cycle, interval: Duration, mut stop_rx: watch::Receiver<bool>) {
    let mut cycles: u64 = 0;

    loop {
        // In-flight probe tasks are detached, not aborted, when stop wins
        tokio::select! {
            biased;
            _ = stop_requested(&mut stop_rx) => break,
            result = AssertUnwindSafe(cycle.run()).catch_unwind() => {
                cycles += 1;
                match result {
                    Ok(Ok(())) => debug!(cycle = cycles, "Monitoring cycle completed"),
                    Ok(Err(e)) => error!(cycle = cycles, "Monitoring cycle failed: {:#}", e),
                    Err(panic) => error!(
                        cycle = cycles,
                        "Monitoring cycle panicked: {}",
                        panic_message(panic.as_ref())
                    ),
                }
            }
        }

        tokio::select! {
            biased;
            _ = stop_requested(&mut stop_rx) => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(cycles, "Monitoring loop exited");
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
