use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::catalog::CityCatalog;

/// Which analyzer turns raw forecasts into daily statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    #[default]
    Builtin,
    Command,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub kind: AnalyzerKind,

    /// Example TOML:
    /// [analyzer]
    /// kind = "command"
    /// program = "python3"
    /// args = ["external/analyzer.py"]
    pub program: String,
    pub args: Vec<String>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            kind: AnalyzerKind::Builtin,
            program: "python3".to_string(),
            args: vec!["external/analyzer.py".to_string()],
        }
    }
}

/// Layout of the persisted aggregated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub delimiter: char,
    pub decimal_separator: char,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { delimiter: ';', decimal_separator: ',' }
    }
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub weather_data_dir: PathBuf,
    pub analyze_dir: PathBuf,
    pub aggregated_csv_path: PathBuf,

    /// Error-level events are written here; the file is truncated on every start.
    pub log_file: PathBuf,
    /// Console filter, `RUST_LOG` syntax.
    pub log_level: String,

    pub fetch_timeout_secs: f64,
    /// Upper bound for reading one analysis document.
    pub read_timeout_secs: f64,

    pub analyzer: AnalyzerConfig,
    pub table: TableConfig,

    /// Overrides the built-in city list when non-empty.
    ///
    /// [cities]
    /// MOSCOW = "https://..."
    pub cities: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            weather_data_dir: PathBuf::from("weather_data"),
            analyze_dir: PathBuf::from("analyze_data"),
            aggregated_csv_path: PathBuf::from("aggregated_data.csv"),
            log_file: PathBuf::from("weather_app.log"),
            log_level: "info".to_string(),
            fetch_timeout_secs: 1.5,
            read_timeout_secs: 5.0,
            analyzer: AnalyzerConfig::default(),
            table: TableConfig::default(),
            cities: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load config from the platform location, or defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    /// Load config from `path`, or defaults if the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "trip-weather", "trip-weather")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.table.delimiter.is_ascii() {
            return Err(anyhow!(
                "Table delimiter must be an ASCII character, got {:?}",
                self.table.delimiter
            ));
        }
        if self.table.delimiter == self.table.decimal_separator {
            return Err(anyhow!(
                "Table delimiter and decimal separator must differ (both are {:?})",
                self.table.delimiter
            ));
        }
        for (name, secs) in [
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            ("read_timeout_secs", self.read_timeout_secs),
        ] {
            if !(secs > 0.0 && Duration::try_from_secs_f64(secs).is_ok()) {
                return Err(anyhow!("{name} must be a positive number of seconds, got {secs}"));
            }
        }
        Ok(())
    }

    /// Values that do not fit a `Duration` saturate to `Duration::MAX`.
    pub fn fetch_timeout(&self) -> Duration {
        seconds(self.fetch_timeout_secs)
    }

    pub fn read_timeout(&self) -> Duration {
        seconds(self.read_timeout_secs)
    }

    /// Configured cities, or the built-in list when none are configured.
    pub fn catalog(&self) -> CityCatalog {
        if self.cities.is_empty() {
            CityCatalog::default()
        } else {
            CityCatalog::from_pairs(self.cities.clone())
        }
    }
}

fn seconds(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
