use std::collections::BTreeMap;
use std::time::Duration;
use std::{env, fmt, fs, path};

use pingwatch::{
    CommandPriority, MonitorSettings, Region, RegionRegistry, RegistryError, RetryingPriority,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    ReadFailed { path: path::PathBuf, source: std::io::Error },
    #[error("Failed to write config {}: {source}", path.display())]
    WriteFailed { path: path::PathBuf, source: std::io::Error },
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("Could not determine a config directory (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error(transparent)]
    UnknownRegion(#[from] pingwatch::region::UnknownRegion),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub monitor: MonitorSection,

    /// Endpoint overrides keyed by region name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub regions: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub priority: PrioritySection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSection {
    pub region: String,
    pub interval_seconds: u64,
    pub probe_timeout_ms: u64,
    pub collection_timeout_ms: u64,
    pub content_read: bool,
    pub export_dir: path::PathBuf,
}

/// Commands applying an OS network priority policy while monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrioritySection {
    pub enabled: bool,
    pub max_attempts: u32,
    pub enable: Vec<Vec<String>>,
    pub disable: Vec<Vec<String>>,
}

impl Default for PrioritySection {
    fn default() -> Self {
        Self { enabled: false, max_attempts: 3, enable: Vec::new(), disable: Vec::new() }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/pingwatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("pingwatch/config.toml"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorSection {
                region: Region::Na.to_string(),
                interval_seconds: 2,
                probe_timeout_ms: 3_000,
                collection_timeout_ms: 10_000,
                content_read: true,
                export_dir: path::PathBuf::from("."),
            },
            regions: BTreeMap::new(),
            priority: PrioritySection::default(),
        }
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);
        let write_2 = write_indented(2);

        writeln!(f, "Current Configuration:")?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Region", &self.monitor.region)?;
        write_1(f, "Interval (s)", &self.monitor.interval_seconds)?;
        write_1(f, "Probe Timeout (ms)", &self.monitor.probe_timeout_ms)?;
        write_1(f, "Collection Timeout (ms)", &self.monitor.collection_timeout_ms)?;
        write_1(f, "Content Read", &self.monitor.content_read)?;
        write_1(f, "Export Directory", &self.monitor.export_dir.display())?;

        if !self.regions.is_empty() {
            write_title_1(f, "Endpoint Overrides")?;
            for (region, endpoints) in &self.regions {
                write_1(f, region, &endpoints.len())?;
                for endpoint in endpoints {
                    write_2(f, "-", endpoint)?;
                }
            }
        }

        write_title_1(f, "Network Priority")?;
        write_1(f, "Enabled", &self.priority.enabled)?;
        write_1(f, "Max Attempts", &self.priority.max_attempts)?;
        write_1(f, "Enable Commands", &self.priority.enable.len())?;
        write_1(f, "Disable Commands", &self.priority.disable.len())?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/pingwatch/config.toml
    ///  or the specified path if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_failed =
            |source| ConfigError::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    pub fn region(&self) -> Result<Region, ConfigError> {
        Ok(self.monitor.region.parse()?)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_seconds.max(1))
    }

    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings::builder()
            .probe_timeout(Duration::from_millis(self.monitor.probe_timeout_ms))
            .collection_timeout(Duration::from_millis(self.monitor.collection_timeout_ms))
            .content_read(self.monitor.content_read)
            .export_dir(self.monitor.export_dir.clone())
            .build()
    }

    /// Built-in endpoint table with any configured overrides applied
    pub fn registry(&self, initial: Region) -> Result<RegionRegistry, ConfigError> {
        if self.regions.is_empty() {
            return Ok(RegionRegistry::with_defaults(initial));
        }

        let defaults = RegionRegistry::with_defaults(initial);
        let mut table: Vec<(Region, Vec<String>)> = Region::ALL
            .into_iter()
            .filter_map(|region| defaults.endpoints_for(region).map(|e| (region, e.to_vec())))
            .collect();

        for (name, endpoints) in &self.regions {
            let region: Region = name.parse()?;
            if let Some(slot) = table.iter_mut().find(|(r, _)| *r == region) {
                slot.1 = endpoints.clone();
            }
        }

        Ok(RegionRegistry::from_table(table, initial)?)
    }

    pub fn priority_policy(&self) -> RetryingPriority<CommandPriority> {
        let commands =
            CommandPriority::new(self.priority.enable.clone(), self.priority.disable.clone());
        RetryingPriority::new(commands, self.priority.max_attempts, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_config_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config");

        let config = Config::from_config(Some(&path)).unwrap();

        assert_eq!(config, Config::default());
        assert!(dir.path().join("nested").join("config.toml").exists());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.monitor.region = "EUW".into();
        config.regions.insert("KR".into(), vec!["https://kr.example".into()]);
        config.write_config(&path).unwrap();

        let loaded = Config::from_config(Some(&path)).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.region().unwrap(), Region::Euw);
    }

    #[test]
    fn test_overrides_replace_region_endpoints() {
        let mut config = Config::default();
        config.regions.insert("kr".into(), vec!["https://kr.example".into()]);

        let registry = config.registry(Region::Kr).unwrap();
        assert_eq!(&*registry.active().endpoints, &["https://kr.example".to_string()][..]);
        assert_eq!(registry.available_regions(), Region::ALL.to_vec());
    }

    #[test]
    fn test_invalid_overrides_are_rejected() {
        let mut config = Config::default();
        config.regions.insert("OCE".into(), vec!["https://oce.example".into()]);
        assert!(matches!(config.registry(Region::Na), Err(ConfigError::UnknownRegion(_))));

        let mut config = Config::default();
        config.regions.insert("NA".into(), Vec::new());
        assert!(matches!(config.registry(Region::Na), Err(ConfigError::Registry(_))));
    }

    #[test]
    fn test_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "monitor = 5").unwrap();

        assert!(matches!(Config::from_config(Some(&path)), Err(ConfigError::ParseFailed(_))));
    }

    #[test]
    fn test_display_lists_sections() {
        let rendered = Config::default().to_string();
        assert!(rendered.contains("Monitor"));
        assert!(rendered.contains("Region: NA"));
        assert!(rendered.contains("Network Priority"));
    }
}
