use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{Result, SalesError};
use crate::sales::aggregate::{AggregationOptions, DuplicateRolePolicy, WeekKeyPolicy};
use crate::sales::report::ZeroBaselinePolicy;

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub brand: PathBuf,
    pub product: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            brand: PathBuf::from("data/sales_brand.csv"),
            product: PathBuf::from("data/sales_product.csv"),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            path: PathBuf::from("output/results.json"),
            pretty: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    pub week_key: WeekKeyPolicy,
    pub duplicate_roles: DuplicateRolePolicy,
    pub zero_baseline: ZeroBaselinePolicy,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub aggregation: AggregationConfig,
}

impl Config {
    /// Loads a TOML config file. A file that does not exist yields the
    /// defaults; one that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Config> {
        match fs::read_to_string(path) {
            Ok(text) => { Config::from_toml(&text) },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Config::default())
            },
            Err(e) => { Err(SalesError::Config(format!("failed to read {}: {}", path.display(), e))) }
        }
    }

    pub fn from_toml(text: &str) -> Result<Config> {
        toml::from_str(text).map_err(|e| SalesError::Config(e.to_string()))
    }

    pub fn aggregation_options(&self) -> AggregationOptions {
        AggregationOptions {
            week_key: self.aggregation.week_key,
            duplicate_roles: self.aggregation.duplicate_roles,
        }
    }
}

#[test]
fn test_partial_config_keeps_defaults() {
    let config = Config::from_toml(r#"
        [input]
        brand = "exports/brands.csv"

        [aggregation]
        week_key = "full_date"
        zero_baseline = "error"
    "#).unwrap();

    assert_eq!(config.input.brand, PathBuf::from("exports/brands.csv"));
    assert_eq!(config.input.product, PathBuf::from("data/sales_product.csv"));
    assert_eq!(config.output, OutputConfig::default());
    assert_eq!(config.aggregation.week_key, WeekKeyPolicy::FullDate);
    assert_eq!(config.aggregation.duplicate_roles, DuplicateRolePolicy::Overwrite);
    assert_eq!(config.aggregation.zero_baseline, ZeroBaselinePolicy::Error);
}

#[test]
fn test_bad_config() {
    assert!(matches!(Config::from_toml("[aggregation]\nweek_key = \"monthly\"\n"), Err(SalesError::Config(_))));
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("sales.toml")).unwrap();
    assert_eq!(config, Config::default());
}
