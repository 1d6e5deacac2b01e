//! sales-dashboard - render the sales & loyalty dashboard from CSV tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Data load, configuration or output failure

mod cli;

use std::path::Path;

use anyhow::{Context, Result};
use cli::Args;
use sales_dashboard::config::{Config, OutputFormat, DEFAULT_CONFIG_FILE};
use sales_dashboard::visualization::{self, HtmlConfig};
use sales_dashboard::{render, DashboardData, FilterSpec};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Args::parse_args();

    // Handle --init-config early (no logging needed)
    if args.init_config {
        if let Err(e) = handle_init_config() {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
        return;
    }

    init_logging(&args);
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Handle --init-config: write a default config file unless one exists.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);
    if path.exists() {
        anyhow::bail!("{DEFAULT_CONFIG_FILE} already exists. Remove it first or edit it manually.");
    }
    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {DEFAULT_CONFIG_FILE}"))?;
    println!("Created {DEFAULT_CONFIG_FILE} with default settings.");
    Ok(())
}

/// `RUST_LOG` wins over the -v / -q flags when set.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            Ok(Config::load(path)?)
        }
        None => Ok(Config::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?),
    }
}

/// Command-line flags override the config file.
fn merge_args(config: &mut Config, args: &Args) {
    if let Some(dir) = &args.data_dir {
        config.data.dir = dir.clone();
    }
    let filters = &mut config.filters;
    if args.date_range.is_some() {
        filters.date_range = args.date_range.clone();
    }
    if args.age_min.is_some() {
        filters.age_min = args.age_min;
    }
    if args.age_max.is_some() {
        filters.age_max = args.age_max;
    }
    if args.genders.is_some() {
        filters.genders = args.genders.clone();
    }
    if args.locations.is_some() {
        filters.locations = args.locations.clone();
    }
    if args.categories.is_some() {
        filters.categories = args.categories.clone();
    }
    if args.loyalty.is_some() {
        filters.loyalty = args.loyalty.clone();
    }
    if let Some(path) = &args.output {
        config.output.path = path.clone();
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if let Some(title) = &args.title {
        config.output.title = title.clone();
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    merge_args(&mut config, &args);

    let data = DashboardData::load(&config.data.paths()).with_context(|| {
        format!("Failed to load data from {}", config.data.dir.display())
    })?;
    let options = data.filter_options()?;

    if args.list_options {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let spec = if args.full {
        config.filters.apply_to(FilterSpec::full(&options))
    } else {
        config.filters.to_spec(&options)
    };
    let view = render(&data, &spec)?;

    let output = match config.output.format {
        OutputFormat::Html => {
            let html_config = HtmlConfig {
                title: config.output.title.clone(),
                ..Default::default()
            };
            visualization::render_html(&view, &html_config)?
        }
        OutputFormat::Json => serde_json::to_string_pretty(&view.to_json()?)?,
    };

    std::fs::write(&config.output.path, output).with_context(|| {
        format!("Failed to write dashboard to {}", config.output.path.display())
    })?;

    info!(
        rows = view.selected_rows,
        total_sales = view.key_metrics.total_sales,
        "Dashboard written to {}",
        config.output.path.display()
    );
    Ok(())
}
