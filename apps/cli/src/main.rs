#![warn(clippy::all)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pingwatch::{
    ChannelObserver, ConsoleReporter, Monitor, NetworkPriority, Region, RoundReport,
};
use tokio::sync::mpsc;
use tracing::{info, warn};

mod cli;
mod config;

use cli::{Cli, Commands, RunArgs};
use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init_with_verbosity(cli.verbose);

    let config = Config::from_config(cli.config.as_ref())?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(config, args).await,
        Commands::Regions => list_regions(&config),
        Commands::Config => {
            println!("{config}");
            Ok(())
        }
    }
}

fn list_regions(config: &Config) -> Result<()> {
    let registry = config.registry(config.region()?)?;
    for region in registry.available_regions() {
        let marker = if region == registry.active_region() { "*" } else { " " };
        println!("{marker} {region}");
        for endpoint in registry.endpoints_for(region).iter().flat_map(|e| e.iter()) {
            println!("    {endpoint}");
        }
    }
    Ok(())
}

async fn run(config: Config, args: RunArgs) -> Result<()> {
    let region: Region = match args.region.as_deref() {
        Some(id) => id.parse()?,
        None => config.region()?,
    };
    let interval = match args.interval {
        Some(secs) => Duration::from_secs(secs.max(1)),
        None => config.interval(),
    };

    let registry = config.registry(region)?;
    let mut monitor = Monitor::new(config.monitor_settings(), registry)
        .context("Failed to build the HTTP prober")?;

    let priority = (args.priority || config.priority.enabled)
        .then(|| Arc::new(config.priority_policy()));
    if let Some(policy) = &priority {
        let policy = Arc::clone(policy);
        if !tokio::task::spawn_blocking(move || policy.enable()).await? {
            warn!("Network priority could not be applied, continuing without it");
        }
    }

    let console_only = !args.json && args.rounds.is_none();
    let reports = if console_only {
        None
    } else {
        let (observer, rx) = ChannelObserver::channel(16);
        monitor = monitor.with_observer(Arc::new(observer));
        Some(rx)
    };

    monitor.start(interval)?;

    match reports {
        None => {
            tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
            info!("Interrupted");
        }
        Some(rx) => {
            let console = ConsoleReporter::new(interval);
            tokio::select! {
                result = drain_reports(rx, &console, args.json, args.rounds) => result?,
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for ctrl-c")?;
                    info!("Interrupted");
                }
            }
        }
    }

    monitor.stop().await;

    if let Some(target) = &args.export {
        let path = monitor.export(target.as_deref())?;
        println!("Exported to {}", path.display());
    }

    if let Some(policy) = priority {
        if !tokio::task::spawn_blocking(move || policy.disable()).await? {
            warn!("Network priority could not be fully removed");
        }
    }

    Ok(())
}

/// Print reports until `rounds` have been seen or the monitor goes away
async fn drain_reports(
    mut rx: mpsc::Receiver<RoundReport>,
    console: &ConsoleReporter,
    json: bool,
    rounds: Option<u64>,
) -> Result<()> {
    let mut seen: u64 = 0;
    while let Some(report) = rx.recv().await {
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", console.render(&report));
        }

        seen += 1;
        if rounds.is_some_and(|limit| seen >= limit) {
            break;
        }
    }
    Ok(())
}

