//! Configuration file handling.
//!
//! Loads `.sales-dashboard.toml`: where the data lives, the initial filter
//! state, and how the rendered dashboard is written.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::DashboardError;
use crate::filter::{DateSelection, FilterOptions, FilterSpec, LoyaltyMode};
use crate::loader::{DataPaths, AD_BUDGET_FILE, CUSTOMERS_FILE, TRANSACTIONS_FILE};

pub const DEFAULT_CONFIG_FILE: &str = ".sales-dashboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub filters: FiltersConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Source table locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Directory holding the three CSV files.
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_transactions_file")]
    pub transactions_file: String,

    #[serde(default = "default_customers_file")]
    pub customers_file: String,

    #[serde(default = "default_ad_budget_file")]
    pub ad_budget_file: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            transactions_file: default_transactions_file(),
            customers_file: default_customers_file(),
            ad_budget_file: default_ad_budget_file(),
        }
    }
}

impl DataConfig {
    pub fn paths(&self) -> DataPaths {
        DataPaths {
            transactions: self.dir.join(&self.transactions_file),
            customers: self.dir.join(&self.customers_file),
            ad_budget: self.dir.join(&self.ad_budget_file),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_transactions_file() -> String {
    TRANSACTIONS_FILE.to_string()
}

fn default_customers_file() -> String {
    CUSTOMERS_FILE.to_string()
}

fn default_ad_budget_file() -> String {
    AD_BUDGET_FILE.to_string()
}

/// Initial filter state. Unset fields keep the dashboard defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FiltersConfig {
    /// `START..END`, a single date, or empty for the full range.
    #[serde(default)]
    pub date_range: Option<String>,

    #[serde(default)]
    pub age_min: Option<i64>,

    #[serde(default)]
    pub age_max: Option<i64>,

    #[serde(default)]
    pub genders: Option<Vec<String>>,

    #[serde(default)]
    pub locations: Option<Vec<String>>,

    #[serde(default)]
    pub categories: Option<Vec<String>>,

    /// all, members, or non-members.
    #[serde(default)]
    pub loyalty: Option<String>,
}

impl FiltersConfig {
    /// Overlay the configured values on `base`. Malformed dates or loyalty
    /// modes are logged and ignored.
    pub fn apply_to(&self, mut base: FilterSpec) -> FilterSpec {
        if let Some(text) = &self.date_range {
            base.date = DateSelection::parse_lenient(text);
        }
        if let Some(min) = self.age_min {
            base.age_range.0 = min;
        }
        if let Some(max) = self.age_max {
            base.age_range.1 = max;
        }
        if let Some(genders) = &self.genders {
            base.genders = genders.clone();
        }
        if let Some(locations) = &self.locations {
            base.locations = locations.clone();
        }
        if let Some(categories) = &self.categories {
            base.categories = categories.clone();
        }
        if let Some(text) = &self.loyalty {
            base.loyalty = text.parse().unwrap_or_else(|err| {
                warn!("{err}; showing all customers");
                LoyaltyMode::All
            });
        }
        base
    }

    /// The dashboard's opening filter state with this config applied.
    pub fn to_spec(&self, options: &FilterOptions) -> FilterSpec {
        self.apply_to(FilterSpec::dashboard_default(options))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Html,
    Json,
}

/// Rendered output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub format: OutputFormat,

    #[serde(default = "default_output_path")]
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            format: OutputFormat::default(),
            path: default_output_path(),
        }
    }
}

fn default_title() -> String {
    "UAE Sales & Loyalty Dashboard".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("dashboard.html")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self, DashboardError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DashboardError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            DashboardError::Config(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Load `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, DashboardError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Default configuration rendered as TOML, for `--init-config`.
    pub fn default_toml() -> String {
        format!(
            r#"# sales-dashboard configuration

[data]
dir = "data"
transactions_file = "{TRANSACTIONS_FILE}"
customers_file = "{CUSTOMERS_FILE}"
ad_budget_file = "{AD_BUDGET_FILE}"

[filters]
# date_range = "2024-01-01..2024-03-31"
age_min = 25
age_max = 45
# genders = ["Female", "Male"]
# locations = ["Dubai", "Abu Dhabi"]
# categories = ["Grocery"]
loyalty = "all"

[output]
title = "{}"
format = "html"
path = "dashboard.html"
"#,
            default_title()
        )
    }
}
