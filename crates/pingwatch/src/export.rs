//! On-demand export of the monitor state.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ExportError;
use crate::region::{Region, RegionRegistry};
use crate::stats::{StatsAggregator, StatsSnapshot};

/// Snapshot of the monitor written by an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub region: Region,
    pub endpoints: Vec<String>,
    pub stats: StatsSnapshot,

    /// Unrounded latency history, oldest first
    pub latency_history: Vec<f64>,

    /// Unrounded per-round loss history, oldest first
    pub loss_history: Vec<f64>,

    pub exported_at: DateTime<Utc>,
}

/// Writes export records as pretty-printed JSON
pub struct Exporter {
    dir: PathBuf,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Collect a record from the registry and statistics
    pub fn capture(registry: &RegionRegistry, stats: &StatsAggregator) -> ExportRecord {
        let active = registry.active();
        ExportRecord {
            region: active.region,
            endpoints: active.endpoints.to_vec(),
            stats: stats.snapshot(),
            latency_history: stats.latency_history(),
            loss_history: stats.loss_history(),
            exported_at: Utc::now(),
        }
    }

    /// File name used when no destination is given
    pub fn default_file_name(region: Region, at: DateTime<Utc>) -> String {
        format!("ping_export_{}_{}.json", region, at.format("%Y%m%d_%H%M%S"))
    }

    /// Write `record` to `target`, or to the default file in the export dir
    ///
    /// Returns the path written.
    pub fn write(&self, record: &ExportRecord, target: Option<&Path>) -> Result<PathBuf, ExportError> {
        let path = match target {
            Some(path) => path.to_path_buf(),
            None => self.dir.join(Self::default_file_name(record.region, record.exported_at)),
        };

        let json = serde_json::to_string_pretty(record)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| ExportError::Io { path: path.clone(), source })?;
        }
        fs::write(&path, json).map_err(|source| ExportError::Io { path: path.clone(), source })?;

        info!(path = %path.display(), region = %record.region, "Exported monitor snapshot");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            Exporter::default_file_name(Region::Eune, at),
            "ping_export_EUNE_20240309_070501.json"
        );
    }

    #[test]
    fn test_capture_reflects_active_region() {
        let registry = RegionRegistry::with_defaults(Region::Na);
        assert!(registry.set_region("jp"));
        let stats = StatsAggregator::new(100, 20, 10);

        let record = Exporter::capture(&registry, &stats);
        assert_eq!(record.region, Region::Jp);
        assert_eq!(record.endpoints, registry.endpoints_for(Region::Jp).unwrap().to_vec());
        assert!(record.latency_history.is_empty());
        assert_eq!(record.stats, StatsSnapshot::default());
    }
}
