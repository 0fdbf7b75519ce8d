//! Macrofeed CLI: run the feed, check a catalog, fetch a single entry.
//!
//! Commands:
//! - `run`: run the pass / idle scheduler (forever, or once with `--once`)
//! - `check`: load the catalog and report unsupported sources and bad entries
//! - `fetch`: acquire and normalize one ticker and print the rows
//! - `config`: print the default configuration as TOML

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use macrofeed_core::{Frequency, TickerSpec};
use macrofeed_runner::{
    acquire_entry, CatalogProvider, FeedConfig, PassOutcome, RunContext, Scheduler, ThreadSleeper,
};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "macrofeed.toml";

#[derive(Parser)]
#[command(
    name = "macrofeed",
    about = "Macrofeed: periodic acquisition and alignment of economic indicators"
)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scheduler: a pass over the catalog, then sleep, repeatedly.
    Run {
        /// Path to a TOML config file. Defaults to ./macrofeed.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Catalog URL or path, overriding the config.
        #[arg(long)]
        catalog: Option<String>,

        /// Output directory, overriding the config.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Run a single pass and exit.
        #[arg(long, default_value_t = false)]
        once: bool,
    },
    /// Load the catalog and report problems without fetching anything.
    Check {
        /// Path to a TOML config file. Defaults to ./macrofeed.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Catalog URL or path, overriding the config.
        #[arg(long)]
        catalog: Option<String>,
    },
    /// Acquire and normalize a single ticker, printing the resulting rows.
    Fetch {
        /// Source name (fred, yfinance, sec, cftc, investing, ycharts, empty).
        #[arg(long)]
        source: String,

        /// Provider-specific ticker.
        #[arg(long)]
        ticker: String,

        /// Column header. Defaults to the ticker.
        #[arg(long)]
        header: Option<String>,

        /// Snap to period starts: D, W, M, Q or Y.
        #[arg(long)]
        frequency: Option<String>,

        /// Shift forward by this many months after snapping.
        #[arg(long, allow_hyphen_values = true)]
        offset: Option<i32>,

        /// Category name, used to select day-shift exceptions.
        #[arg(long, default_value = "")]
        category: String,

        /// Path to a TOML config file. Defaults to ./macrofeed.toml if present.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            catalog,
            output,
            once,
        } => run_feed(config.as_deref(), catalog, output, once),
        Commands::Check { config, catalog } => run_check(config.as_deref(), catalog),
        Commands::Fetch {
            source,
            ticker,
            header,
            frequency,
            offset,
            category,
            config,
        } => run_fetch(
            config.as_deref(),
            source,
            ticker,
            header,
            frequency,
            offset,
            &category,
        ),
        Commands::Config => {
            print!("{}", FeedConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<FeedConfig> {
    match path {
        Some(path) => FeedConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            Ok(FeedConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?)
        }
        None => Ok(FeedConfig::default()),
    }
}

fn run_feed(
    config_path: Option<&Path>,
    catalog: Option<String>,
    output: Option<PathBuf>,
    once: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(catalog) = catalog {
        config.catalog = catalog;
    }
    if let Some(output) = output {
        config.output_dir = output;
    }
    if once {
        config.max_passes = 1;
    }
    config.validate()?;

    info!(
        catalog = %config.catalog,
        output_dir = %config.output_dir.display(),
        format = config.format.extension(),
        interval_secs = config.interval_secs,
        jitter_secs = config.jitter_secs,
        fingerprint = %&config.fingerprint()[..12],
        "starting macrofeed"
    );

    let ctx = RunContext::from_config(config);
    let mut scheduler = Scheduler::new(&ctx, ThreadSleeper);
    let passes = scheduler.run();

    if let Some(PassOutcome::Abandoned(e)) = scheduler.last_outcome() {
        bail!("last pass abandoned: {e}");
    }
    info!(passes, "scheduler stopped");
    Ok(())
}

fn run_check(config_path: Option<&Path>, catalog: Option<String>) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(catalog) = catalog {
        config.catalog = catalog;
    }
    let ctx = RunContext::from_config(config);
    let catalog = ctx
        .catalog
        .load()
        .with_context(|| format!("loading catalog from {}", ctx.catalog.location()))?;

    println!(
        "{} categories, {} entries",
        catalog.categories.len(),
        catalog.entry_count()
    );
    let mut problems = 0;
    for category in &catalog.categories {
        println!(
            "  {:<24} {:>3} entries  sort={}",
            category.name,
            category.entries.len(),
            ctx.sort_policy.order_for(&category.name)
        );
        for entry in &category.entries {
            if !ctx.registry.is_supported(&entry.source) {
                println!(
                    "    unsupported source '{}' for {}",
                    entry.source, entry.header
                );
                problems += 1;
            }
        }
        for header in category.duplicate_headers() {
            println!("    duplicate header '{header}'");
            problems += 1;
        }
    }
    for skipped in &catalog.skipped {
        println!(
            "  skipped {}[{}]: {}",
            skipped.category, skipped.index, skipped.reason
        );
        problems += 1;
    }

    if problems > 0 {
        bail!("{problems} problem(s) found in catalog");
    }
    println!("catalog OK");
    Ok(())
}

fn run_fetch(
    config_path: Option<&Path>,
    source: String,
    ticker: String,
    header: Option<String>,
    frequency: Option<String>,
    offset: Option<i32>,
    category: &str,
) -> Result<()> {
    let config = load_config(config_path)?;
    let frequency = frequency
        .as_deref()
        .map(str::parse::<Frequency>)
        .transpose()?;
    let entry = TickerSpec {
        header: header.unwrap_or_else(|| ticker.clone()),
        source,
        ticker,
        frequency,
        offset,
    };

    let ctx = RunContext::from_config(config);
    let outcome = acquire_entry(&ctx, category, &entry)?;

    let mut rows = outcome.series.rows;
    rows.sort_by(|a, b| b.0.cmp(&a.0));
    println!("date,{}", entry.header);
    for (date, value) in &rows {
        let cell = value.as_ref().map(|v| v.to_string()).unwrap_or_default();
        println!("{},{}", date.format("%Y-%m-%d"), cell);
    }
    eprintln!(
        "{} rows, {} rejected",
        rows.len(),
        outcome.rejected.len()
    );
    Ok(())
}
