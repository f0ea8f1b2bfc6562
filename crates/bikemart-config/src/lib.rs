// bikemart-config - Configuration for mart builds
//
// Supports configuration from multiple sources:
// 1. CLI flags (highest priority, applied by the binary)
// 2. Environment variables (BIKEMART_* prefix)
// 3. Config file path from BIKEMART_CONFIG env var
// 4. Config file contents from BIKEMART_CONFIG_CONTENT env var
// 5. Default config file locations (./bikemart.toml, ./config.toml)
// 6. Built-in defaults (lowest priority)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{apply_env_overrides, EnvSource, ENV_PREFIX};
pub use sources::StdEnvSource;

/// Main pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BikemartConfig {
    #[serde(default)]
    pub input: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub years: YearRange,

    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub parallel: ParallelConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where trip files and the station master live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Trip files are read from `<base_dir>/<year>/*.parquet`
    pub base_dir: PathBuf,
    pub station_master: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("data/parquet"),
            station_master: PathBuf::from("data/bcycle_master_location.csv"),
        }
    }
}

/// Mart output directory and Parquet layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub row_group_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data/marts"),
            row_group_size: 32 * 1024,
        }
    }
}

/// Inclusive range of years to process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 2020,
            end: 2025,
        }
    }
}

impl YearRange {
    pub fn years(&self) -> Vec<i32> {
        (self.start..=self.end).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid year range '{0}': expected YYYY or YYYY..=YYYY")]
pub struct ParseYearRangeError(String);

impl std::str::FromStr for YearRange {
    type Err = ParseYearRangeError;

    /// Accepts `2021`, `2020..=2025`, `2020..2025` (inclusive too) and `2020-2025`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseYearRangeError(s.to_string());
        let s = s.trim();
        let (start, end) = if let Some((a, b)) = s.split_once("..=") {
            (a, b)
        } else if let Some((a, b)) = s.split_once("..") {
            (a, b)
        } else if let Some((a, b)) = s.split_once('-') {
            (a, b)
        } else {
            (s, s)
        };
        let start = start.trim().parse::<i32>().map_err(|_| invalid())?;
        let end = end.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { start, end })
    }
}

/// Batch reading configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub rows: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { rows: 500_000 }
    }
}

/// File-level parallelism
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// 1 = sequential; 0 = one worker per CPU
    pub workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { workers: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl BikemartConfig {
    /// Load configuration from file and environment sources
    pub fn load() -> Result<Self> {
        sources::load_config(&StdEnvSource)
    }

    /// Load configuration from a specific file path (for CLI --config flag),
    /// then apply environment overrides
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        sources::load_from_file_path(path.as_ref(), &StdEnvSource)
    }

    /// Load configuration with overrides supplied by a custom `EnvSource`
    pub fn load_with_env<E: EnvSource>(env: &E) -> Result<Self> {
        sources::load_config(env)
    }

    /// Parse TOML content on top of the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BikemartConfig::default();
        assert_eq!(config.input.base_dir, PathBuf::from("data/parquet"));
        assert_eq!(config.years.years(), vec![2020, 2021, 2022, 2023, 2024, 2025]);
        assert_eq!(config.batch.rows, 500_000);
        assert_eq!(config.parallel.workers, 1);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = BikemartConfig::from_toml(
            r#"
            [input]
            base_dir = "/srv/trips"

            [years]
            start = 2022

            [logging]
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.input.base_dir, PathBuf::from("/srv/trips"));
        assert_eq!(
            config.input.station_master,
            PathBuf::from("data/bcycle_master_location.csv")
        );
        assert_eq!(config.years, YearRange { start: 2022, end: 2025 });
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.output.row_group_size, 32 * 1024);
    }

    #[test]
    fn test_year_range_from_str() {
        let single: YearRange = "2021".parse().unwrap();
        assert_eq!(single.years(), vec![2021]);
        assert_eq!(
            "2020..=2022".parse::<YearRange>().unwrap().years(),
            vec![2020, 2021, 2022]
        );
        assert_eq!(
            "2023-2024".parse::<YearRange>().unwrap(),
            YearRange { start: 2023, end: 2024 }
        );
        assert!("twenty".parse::<YearRange>().is_err());
    }
}
