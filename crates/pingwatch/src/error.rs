use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

use crate::region::Region;

/// Lifecycle errors reported by [`crate::Monitor`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("Monitoring is already active")]
    AlreadyActive,
}

/// Failure to write an export snapshot
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write export to {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("Failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Invalid region table passed to [`crate::RegionRegistry`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Region table is empty")]
    EmptyTable,
    #[error("Region {0} has no endpoints")]
    EmptyRegion(Region),
    #[error("Invalid endpoint {endpoint} for region {region}: {reason}")]
    InvalidEndpoint { region: Region, endpoint: String, reason: String },
    #[error("Initial region {0} is not in the table")]
    UnknownInitialRegion(Region),
}
