//! Region registry.
//!
//! Maps each game region to its probe endpoints. The table is built once and
//! never mutated; switching regions swaps the active `Arc` so readers only
//! ever see a complete endpoint set.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::error::RegistryError;

/// Known server regions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Na,
    Euw,
    Eune,
    Kr,
    Jp,
}

impl Region {
    /// All regions in display order
    pub const ALL: [Region; 5] = [Region::Na, Region::Euw, Region::Eune, Region::Kr, Region::Jp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Na => "NA",
            Region::Euw => "EUW",
            Region::Eune => "EUNE",
            Region::Kr => "KR",
            Region::Jp => "JP",
        }
    }

    /// Built-in endpoints for this region
    fn default_endpoints(&self) -> &'static [&'static str] {
        match self {
            Region::Na => &[
                "https://clientconfig.rpg.riotgames.com/api/v1/config/public",
                "https://na1.api.riotgames.com",
                "https://americas.api.riotgames.com",
            ],
            Region::Euw => &[
                "https://euw1.api.riotgames.com",
                "https://europe.api.riotgames.com",
                "https://riot.nl",
            ],
            Region::Eune => &["https://eun1.api.riotgames.com", "https://europe.api.riotgames.com"],
            Region::Kr => &["https://kr.api.riotgames.com", "https://asia.api.riotgames.com"],
            Region::Jp => &["https://jp1.api.riotgames.com", "https://asia.api.riotgames.com"],
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier that does not name a known region
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown region: {0}")]
pub struct UnknownRegion(pub String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownRegion(s.to_string()))
    }
}

/// The endpoint set currently being probed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSet {
    pub region: Region,
    pub endpoints: Arc<[String]>,
}

/// Region -> endpoint table with an atomically switchable active set
#[derive(Debug)]
pub struct RegionRegistry {
    table: Vec<(Region, Arc<[String]>)>,
    active: RwLock<ActiveSet>,
}

impl RegionRegistry {
    /// Registry over the built-in endpoint table
    pub fn with_defaults(initial: Region) -> Self {
        let table: Vec<(Region, Arc<[String]>)> = Region::ALL
            .into_iter()
            .map(|region| {
                let endpoints: Arc<[String]> =
                    region.default_endpoints().iter().map(|e| e.to_string()).collect();
                (region, endpoints)
            })
            .collect();

        let endpoints = Self::lookup(&table, initial).unwrap_or_else(|| Arc::from(Vec::new()));
        Self { table, active: RwLock::new(ActiveSet { region: initial, endpoints }) }
    }

    /// Registry over a caller-supplied table
    ///
    /// Endpoint lists are deduplicated preserving order. Every region must
    /// have at least one `http`/`https` endpoint.
    pub fn from_table(
        entries: Vec<(Region, Vec<String>)>,
        initial: Region,
    ) -> Result<Self, RegistryError> {
        if entries.is_empty() {
            return Err(RegistryError::EmptyTable);
        }

        let mut table: Vec<(Region, Arc<[String]>)> = Vec::with_capacity(entries.len());
        for (region, endpoints) in entries {
            let mut unique: Vec<String> = Vec::with_capacity(endpoints.len());
            for endpoint in endpoints {
                validate_endpoint(region, &endpoint)?;
                if !unique.contains(&endpoint) {
                    unique.push(endpoint);
                }
            }
            if unique.is_empty() {
                return Err(RegistryError::EmptyRegion(region));
            }

            // Later entries for the same region replace earlier ones
            match table.iter_mut().find(|(r, _)| *r == region) {
                Some(slot) => slot.1 = unique.into(),
                None => table.push((region, unique.into())),
            }
        }
        table.sort_by_key(|(region, _)| *region);

        let endpoints =
            Self::lookup(&table, initial).ok_or(RegistryError::UnknownInitialRegion(initial))?;
        Ok(Self { table, active: RwLock::new(ActiveSet { region: initial, endpoints }) })
    }

    fn lookup(table: &[(Region, Arc<[String]>)], region: Region) -> Option<Arc<[String]>> {
        table.iter().find(|(r, _)| *r == region).map(|(_, endpoints)| Arc::clone(endpoints))
    }

    /// Switch to the region named by `id`
    ///
    /// Returns false and leaves the active set untouched when `id` is not a
    /// region in this registry.
    pub fn set_region(&self, id: &str) -> bool {
        match id.parse::<Region>() {
            Ok(region) => self.select(region),
            Err(e) => {
                warn!("Rejected region switch: {}", e);
                false
            }
        }
    }

    /// Switch to `region` if it is present in the table
    pub fn select(&self, region: Region) -> bool {
        let Some(endpoints) = Self::lookup(&self.table, region) else {
            warn!(%region, "Rejected region switch: region not configured");
            return false;
        };

        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        *active = ActiveSet { region, endpoints };
        info!(%region, endpoints = active.endpoints.len(), "Switched active region");
        true
    }

    /// Regions available for switching, in order
    pub fn available_regions(&self) -> Vec<Region> {
        self.table.iter().map(|(region, _)| *region).collect()
    }

    /// Snapshot of the active region and its endpoints
    pub fn active(&self) -> ActiveSet {
        self.active.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn active_region(&self) -> Region {
        self.active.read().unwrap_or_else(PoisonError::into_inner).region
    }

    /// Endpoints configured for `region`
    pub fn endpoints_for(&self, region: Region) -> Option<Arc<[String]>> {
        Self::lookup(&self.table, region)
    }
}

fn validate_endpoint(region: Region, endpoint: &str) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidEndpoint {
        region,
        endpoint: endpoint.to_string(),
        reason,
    };

    let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme {}", other))),
    }
}
