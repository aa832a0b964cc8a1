//! MarketSieve CLI — download, screen, check, watch, and cache commands.
//!
//! Commands:
//! - `download` — fetch daily bars from Yahoo Finance into the CSV cache
//! - `screen` — run a condition config over a universe, print matches
//! - `check` — evaluate a condition config against one symbol, verbose
//! - `watch` — poll quotes and fire price triggers from a TOML file
//! - `cache status` — report cached symbols, ranges, and freshness

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use marketsieve_core::conditions::{build_conditions, Condition, ConditionResult, ConditionSpec};
use marketsieve_core::data::{BarProvider, CachingProvider, CsvCache, Universe, YahooProvider};
use marketsieve_core::monitor::{MonitorEvent, PriceMonitor, ProviderQuoteSource};
use marketsieve_core::screener::{export_csv, Screener};
use marketsieve_core::trigger::{TriggerChecker, TriggerSpec};

#[derive(Parser)]
#[command(name = "marketsieve", about = "MarketSieve — condition-based stock screener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch daily bars from Yahoo Finance into the CSV cache.
    Download {
        /// Symbols to download (e.g., 005930.KS AAPL).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Trailing days of history to fetch.
        #[arg(long, default_value_t = 365)]
        days: usize,

        /// Force re-download even if the cache is fresh.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Run a condition config over a universe and print the matches.
    Screen {
        /// Path to a TOML condition config.
        #[arg(long)]
        conditions: PathBuf,

        /// Path to a TOML universe file.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Explicit ticker list (mutually exclusive with --universe).
        #[arg(long, num_args = 1..)]
        tickers: Vec<String>,

        /// Parallel workers for the screening pool.
        #[arg(long, default_value_t = 4)]
        workers: usize,

        /// Write matches to this CSV file as well.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Evaluate a condition config against one symbol, showing every
    /// condition's verdict and values.
    Check {
        /// Symbol to evaluate.
        symbol: String,

        /// Path to a TOML condition config.
        #[arg(long)]
        conditions: PathBuf,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Poll quotes and fire price triggers from a TOML file.
    Watch {
        /// Path to a TOML trigger file.
        #[arg(long)]
        triggers: PathBuf,

        /// Polling interval in seconds.
        #[arg(long, default_value_t = 30)]
        interval_secs: u64,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Report cached symbols, date ranges, bar counts, and freshness.
    Status {
        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
}

#[derive(serde::Deserialize)]
struct ConditionFile {
    conditions: Vec<ConditionSpec>,
}

#[derive(serde::Deserialize)]
struct TriggerFile {
    triggers: Vec<TriggerSpec>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Download {
            symbols,
            days,
            force,
            cache_dir,
        } => run_download(&symbols, days, force, &cache_dir),
        Commands::Screen {
            conditions,
            universe,
            tickers,
            workers,
            out,
            cache_dir,
        } => run_screen(&conditions, universe.as_deref(), &tickers, workers, out.as_deref(), &cache_dir),
        Commands::Check {
            symbol,
            conditions,
            cache_dir,
        } => run_check(&symbol, &conditions, &cache_dir),
        Commands::Watch {
            triggers,
            interval_secs,
            cache_dir,
        } => run_watch(&triggers, interval_secs, &cache_dir),
        Commands::Cache { action } => match action {
            CacheAction::Status { cache_dir } => run_cache_status(&cache_dir),
        },
    }
}

fn make_provider(cache_dir: &Path) -> Result<Arc<dyn BarProvider>> {
    let yahoo = YahooProvider::new().context("failed to build Yahoo client")?;
    let cache = CsvCache::new(cache_dir);
    Ok(Arc::new(CachingProvider::new(cache, Arc::new(yahoo))))
}

fn load_conditions(path: &Path) -> Result<Vec<Arc<dyn Condition>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: ConditionFile =
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))?;
    if file.conditions.is_empty() {
        bail!("{} defines no conditions", path.display());
    }
    let built = build_conditions(&file.conditions)
        .with_context(|| format!("invalid condition in {}", path.display()))?;
    Ok(built.into_iter().map(Arc::from).collect())
}

fn run_download(symbols: &[String], days: usize, force: bool, cache_dir: &Path) -> Result<()> {
    let provider = make_provider(cache_dir)?;

    let mut failed = 0usize;
    for (i, symbol) in symbols.iter().enumerate() {
        print!("[{}/{}] {symbol} ... ", i + 1, symbols.len());
        match provider.get(symbol, days, force) {
            Ok(bars) => println!("{} bars", bars.len()),
            Err(e) => {
                println!("FAILED: {e}");
                failed += 1;
            }
        }
    }

    println!();
    println!("Done. {} succeeded, {failed} failed.", symbols.len() - failed);
    if failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn run_screen(
    conditions_path: &Path,
    universe_path: Option<&Path>,
    tickers: &[String],
    workers: usize,
    out: Option<&Path>,
    cache_dir: &Path,
) -> Result<()> {
    if universe_path.is_some() && !tickers.is_empty() {
        bail!("--universe and --tickers are mutually exclusive");
    }
    if universe_path.is_none() && tickers.is_empty() {
        bail!("one of --universe or --tickers is required");
    }

    let conditions = load_conditions(conditions_path)?;
    let provider = make_provider(cache_dir)?;
    let screener = Screener::new(conditions, provider).with_max_workers(workers);

    let results = if let Some(path) = universe_path {
        let universe = Universe::from_file(path)
            .with_context(|| format!("failed to load universe {}", path.display()))?;
        println!(
            "Screening {} tickers ({} days of history needed)...",
            universe.len(),
            screener.required_days()
        );
        screener.run_universe(&universe)?
    } else {
        let refs: Vec<&str> = tickers.iter().map(|s| s.as_str()).collect();
        println!(
            "Screening {} tickers ({} days of history needed)...",
            refs.len(),
            screener.required_days()
        );
        screener.run(&refs)?
    };

    println!();
    if results.is_empty() {
        println!("No matches.");
    } else {
        println!("{:<12} {:<24} {:>12} {:>14}", "Symbol", "Name", "Price", "Volume");
        println!("{}", "-".repeat(64));
        for result in &results {
            println!(
                "{:<12} {:<24} {:>12.2} {:>14}",
                result.symbol, result.display_name, result.current_price, result.current_volume
            );
        }
        println!();
        println!("{} match(es).", results.len());
    }

    if let Some(path) = out {
        export_csv(&results, path)?;
        println!("Written to {}", path.display());
    }
    Ok(())
}

fn run_check(symbol: &str, conditions_path: &Path, cache_dir: &Path) -> Result<()> {
    let conditions = load_conditions(conditions_path)?;
    let provider = make_provider(cache_dir)?;
    let screener = Screener::new(conditions, provider);

    let result = screener.run_single(symbol)?;
    println!(
        "{} @ {:.2} — {}",
        result.symbol,
        result.current_price,
        if result.matched { "MATCH" } else { "no match" }
    );
    println!();
    for condition_result in &result.results {
        print_condition_result(condition_result, 0);
    }
    Ok(())
}

fn print_condition_result(result: &ConditionResult, depth: usize) {
    let indent = "  ".repeat(depth);
    let verdict = if result.matched { "PASS" } else { "fail" };
    let values: Vec<String> = result
        .values
        .iter()
        .map(|(k, v)| format!("{k}={v:.3}"))
        .collect();
    let detail = match &result.error {
        Some(error) => format!(" [{error}]"),
        None if values.is_empty() => String::new(),
        None => format!(" ({})", values.join(", ")),
    };
    println!("{indent}{verdict}  {}{detail}", result.condition_name);
    for child in &result.children {
        print_condition_result(child, depth + 1);
    }
}

fn run_watch(triggers_path: &Path, interval_secs: u64, cache_dir: &Path) -> Result<()> {
    let content = std::fs::read_to_string(triggers_path)
        .with_context(|| format!("failed to read {}", triggers_path.display()))?;
    let file: TriggerFile = toml::from_str(&content)
        .with_context(|| format!("invalid trigger file {}", triggers_path.display()))?;
    if file.triggers.is_empty() {
        bail!("{} defines no triggers", triggers_path.display());
    }

    let mut checker = TriggerChecker::new();
    let mut symbols: Vec<String> = Vec::new();
    for spec in file.triggers {
        if !symbols.contains(&spec.symbol) {
            symbols.push(spec.symbol.clone());
        }
        checker.add(spec);
    }

    println!(
        "Watching {} symbol(s), {} trigger(s), every {interval_secs}s. Ctrl-C to stop.",
        symbols.len(),
        checker.len()
    );

    let provider = make_provider(cache_dir)?;
    let source = Arc::new(ProviderQuoteSource::new(provider));
    let (tx, rx) = mpsc::channel();
    let _handle = PriceMonitor::new(source, symbols)
        .with_interval(Duration::from_secs(interval_secs))
        .spawn(checker, tx);

    for event in rx {
        match event {
            MonitorEvent::Triggered(event) => {
                println!("*** [{}] {}", event.timestamp.format("%H:%M:%S"), event.message);
            }
            MonitorEvent::Snapshot(snapshots) => {
                for snap in snapshots {
                    match snap.change_pct {
                        Some(change) => {
                            println!("    {:<12} {:>10.2}  {:>+6.2}%", snap.symbol, snap.price, change)
                        }
                        None => println!("    {:<12} {:>10.2}", snap.symbol, snap.price),
                    }
                }
            }
            MonitorEvent::SourceError(message) => eprintln!("quote error: {message}"),
            MonitorEvent::Stopped => break,
        }
    }
    Ok(())
}

fn run_cache_status(cache_dir: &Path) -> Result<()> {
    if !cache_dir.exists() {
        println!("Cache directory does not exist: {}", cache_dir.display());
        return Ok(());
    }

    // Cache files are named {SYMBOL}.csv with a {SYMBOL}.meta.json sidecar.
    let mut symbols: Vec<String> = Vec::new();
    for entry in std::fs::read_dir(cache_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if let Some(symbol) = name.strip_suffix(".csv") {
            symbols.push(symbol.to_string());
        }
    }

    if symbols.is_empty() {
        println!("Cache is empty: {}", cache_dir.display());
        return Ok(());
    }
    symbols.sort();

    let cache = CsvCache::new(cache_dir);
    let refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
    let statuses = cache.status(&refs);

    println!("Cache: {}", cache_dir.display());
    println!("Symbols: {}", statuses.len());
    println!();
    println!("{:<12} {:<25} {:>8} {:>8}", "Symbol", "Date Range", "Bars", "Fresh");
    println!("{}", "-".repeat(56));
    for status in &statuses {
        let range = match (status.start_date, status.end_date) {
            (Some(start), Some(end)) => format!("{start} to {end}"),
            _ => "(no meta)".to_string(),
        };
        println!(
            "{:<12} {:<25} {:>8} {:>8}",
            status.symbol,
            range,
            status.bar_count.unwrap_or(0),
            if status.fresh { "yes" } else { "no" }
        );
    }
    Ok(())
}
