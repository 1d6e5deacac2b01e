//! Command-line interface argument parsing.

use clap::Parser;
use sales_dashboard::config::OutputFormat;
use std::path::PathBuf;
use tracing::Level;

/// sales-dashboard - filter and summarize sales, loyalty and ad-spend data
///
/// Loads transactions.csv, customers.csv and ad_budget.csv from a data
/// directory, applies the selected filters and writes the dashboard as a
/// self-contained HTML page (or JSON).
///
/// Examples:
///   sales-dashboard --data-dir ./data
///   sales-dashboard --date-range 2024-01-01..2024-03-31 --loyalty members
///   sales-dashboard --gender Female --category Grocery,Electronics --format json
///   sales-dashboard --list-options
///   sales-dashboard --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory containing the three CSV tables
    #[arg(short, long, value_name = "DIR", env = "SALES_DASHBOARD_DATA")]
    pub data_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .sales-dashboard.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Date range as START..END (a single date selects the full range)
    #[arg(long, value_name = "RANGE")]
    pub date_range: Option<String>,

    /// Minimum customer age (inclusive)
    #[arg(long, value_name = "AGE")]
    pub age_min: Option<i64>,

    /// Maximum customer age (inclusive)
    #[arg(long, value_name = "AGE")]
    pub age_max: Option<i64>,

    /// Genders to include (comma-separated)
    #[arg(long = "gender", value_name = "LIST", value_delimiter = ',')]
    pub genders: Option<Vec<String>>,

    /// Locations to include (comma-separated)
    #[arg(long = "location", value_name = "LIST", value_delimiter = ',')]
    pub locations: Option<Vec<String>>,

    /// Categories to include (comma-separated)
    #[arg(long = "category", value_name = "LIST", value_delimiter = ',')]
    pub categories: Option<Vec<String>>,

    /// Loyalty membership: all, members, non-members
    #[arg(long, value_name = "MODE")]
    pub loyalty: Option<String>,

    /// Start from every row selected instead of the default age window
    #[arg(long)]
    pub full: bool,

    /// Output file path
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (html, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Page title
    #[arg(long)]
    pub title: Option<String>,

    /// Print the available filter values as JSON and exit
    #[arg(long)]
    pub list_options: bool,

    /// Write a default .sales-dashboard.toml and exit
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_split_on_commas() {
        let args = Args::parse_from([
            "sales-dashboard",
            "--gender",
            "Female,Male",
            "--category",
            "Grocery",
            "--format",
            "json",
        ]);
        assert_eq!(
            args.genders,
            Some(vec!["Female".to_string(), "Male".to_string()])
        );
        assert_eq!(args.categories, Some(vec!["Grocery".to_string()]));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.locations.is_none());
    }

    #[test]
    fn test_log_level() {
        let args = Args::parse_from(["sales-dashboard", "-v"]);
        assert_eq!(args.log_level(), Level::DEBUG);
        let args = Args::parse_from(["sales-dashboard", "-q"]);
        assert_eq!(args.log_level(), Level::WARN);
    }
}
