/// Probe layer - a single latency measurement against one endpoint
///
/// This module is responsible for:
/// - The `Prober` seam used by rounds and the monitor loop
/// - The reqwest-backed HTTP prober
/// - Mapping transport failures onto probe outcomes
pub mod prober;
pub mod types;

pub use prober::{HttpProber, Prober};
pub use types::{ProbeError, ProbeOutcome};
