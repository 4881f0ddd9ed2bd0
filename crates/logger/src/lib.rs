use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{Layer, filter::EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the output format (`json` or compact)
pub const LOG_FORMAT_VAR: &str = "PINGWATCH_LOG_FORMAT";

/// Initialize tracing at INFO
pub fn init() {
    init_with_level(LevelFilter::INFO);
}

/// Initialize tracing from a `-v` count: 0 = INFO, 1 = DEBUG, 2+ = TRACE
pub fn init_with_verbosity(verbosity: u8) {
    init_with_level(level_for(verbosity));
}

fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Initialize the global subscriber; `RUST_LOG` still overrides `level`.
fn init_with_level(level: LevelFilter) {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_format = var(LOG_FORMAT_VAR).unwrap_or_default();

    let log_layer = match log_format.as_str() {
        "json" => tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        "" | "compact" => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        other => {
            let layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_filter(env_filter)
                .boxed();
            tracing_subscriber::registry().with(layer).init();
            warn!("Unknown {} value {:?}, using compact output", LOG_FORMAT_VAR, other);
            return;
        }
    };

    tracing_subscriber::registry().with(log_layer).init();
}
