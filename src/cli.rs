//! CLI definition and dispatch.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::{read_csv_series, CsvAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::adapters::json_series_adapter::{read_series_file, write_series_file, JsonSeriesAdapter};
use crate::adapters::json_strategy_adapter::read_strategy_file;
use crate::domain::config_validation::validate_strategy;
use crate::domain::engine::{filter_series, BacktestEngine, EngineConfig};
use crate::domain::error::{SeriesError, StrategistError};
use crate::domain::expression::Registry;
use crate::domain::series::{TimeSeries, DEFAULT_SPACING_TOLERANCE_PCT};
use crate::domain::strategy::Strategy;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceHistoryPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "strategist", about = "Rule-based trading strategy backtester")]
pub struct Cli {
    /// INI file with [engine] and [logging] settings
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DataFormat {
    Json,
    Csv,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest a strategy over a price series
    Run {
        #[arg(short, long)]
        strategy: PathBuf,
        /// Series file (.json or .csv)
        #[arg(long)]
        series: PathBuf,
        /// Write a JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Record user variables after every step
        #[arg(long)]
        record_variables: bool,
    },
    /// Validate a strategy file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Show length, range and spacing of a series
    Info {
        #[arg(long)]
        series: PathBuf,
    },
    /// Apply a strategy's filters to a series and write the result
    Filter {
        #[arg(short, long)]
        strategy: PathBuf,
        #[arg(long)]
        series: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Pull a date range of one asset from a data directory
    Fetch {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = DataFormat::Json)]
        format: DataFormat,
        #[arg(long)]
        asset: String,
        /// First day, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day (inclusive), YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
        /// Expected seconds between samples
        #[arg(long, default_value_t = 60.0)]
        granularity: f64,
        /// Fetch in chunks of this many days
        #[arg(long)]
        chunk_days: Option<i64>,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the assets available in a data directory
    Assets {
        #[arg(long)]
        data_dir: PathBuf,
        #[arg(long, value_enum, default_value_t = DataFormat::Json)]
        format: DataFormat,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    init_logging(config.as_ref().map(|c| c as &dyn ConfigPort));

    let result = match cli.command {
        Command::Run {
            strategy,
            series,
            output,
            record_variables,
        } => run_backtest(
            config.as_ref(),
            &strategy,
            &series,
            output.as_deref(),
            record_variables,
        ),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Info { series } => run_info(&series),
        Command::Filter {
            strategy,
            series,
            output,
        } => run_filter(&strategy, &series, &output),
        Command::Fetch {
            data_dir,
            format,
            asset,
            start,
            end,
            granularity,
            chunk_days,
            output,
        } => run_fetch(
            &data_dir,
            format,
            &asset,
            (start, end),
            granularity,
            chunk_days,
            &output,
        ),
        Command::Assets { data_dir, format } => run_assets(&data_dir, format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, StrategistError> {
    FileConfigAdapter::from_file(path)
}

/// `RUST_LOG` wins over `[logging] level`, which wins over `info`.
fn init_logging(config: Option<&dyn ConfigPort>) {
    let level = config
        .and_then(|c| c.get_string("logging", "level"))
        .unwrap_or_else(|| "info".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when embedded; keep it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read a `.csv` or JSON series file. CSV files carry no granularity, so
/// the average spacing is used.
pub fn load_series(path: &Path) -> Result<TimeSeries, StrategistError> {
    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return read_series_file(path);
    }
    let mut series = read_csv_series(path, 0.0)?;
    if let Ok((_, average)) = series.is_evenly_spaced(DEFAULT_SPACING_TOLERANCE_PCT) {
        series.granularity = average;
    }
    Ok(series)
}

fn load_strategy(path: &Path) -> Result<Strategy, StrategistError> {
    read_strategy_file(path, &Registry::standard())
}

fn run_backtest(
    config: Option<&FileConfigAdapter>,
    strategy_path: &Path,
    series_path: &Path,
    output_path: Option<&Path>,
    record_variables: bool,
) -> Result<(), StrategistError> {
    let mut engine_config = match config {
        Some(c) => EngineConfig::from_config(c)?,
        None => EngineConfig::default(),
    };
    engine_config.record_variables |= record_variables;

    let strategy = load_strategy(strategy_path)?;
    let series = load_series(series_path)?;
    tracing::info!(
        strategy = %strategy.name,
        samples = series.len(),
        combinations = strategy.combination_count(),
        "loaded inputs"
    );

    let result = BacktestEngine::new(engine_config).run(&strategy, &series)?;

    println!("Strategy:        {}", strategy.name);
    println!("Combinations:    {}", result.runs.len());
    println!("Best run:        #{}", result.best_index);
    for parameter in &result.best_parameters {
        println!("  {} = {}", parameter.name, parameter.value);
    }
    println!("Mark to market:  {:.4}", result.mark_to_market);
    println!("Currency:        {:.4}", result.best.account().currency_balance);
    println!("Assets:          {:.6}", result.best.account().asset_balance);
    println!("Transactions:    {}", result.best.transactions().len());
    println!("Errors:          {}", result.best.errors().len());
    for skipped in &result.skipped_filters {
        println!("Skipped filter:  {} ({}): {}", skipped.position, skipped.filter, skipped.reason);
    }

    if let Some(path) = output_path {
        JsonReportAdapter.write(&result, &strategy, &path.to_string_lossy())?;
        eprintln!("Report written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(strategy_path: &Path) -> Result<(), StrategistError> {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let strategy = load_strategy(strategy_path)?;
    validate_strategy(&strategy)?;

    println!("Name:          {}", strategy.name);
    println!("Engine:        {}", strategy.engine_id);
    for (i, filter) in strategy.filters.iter().enumerate() {
        println!("Filter {}:      {}", i, filter);
    }
    for trigger in &strategy.triggers {
        println!(
            "Trigger:       {} ({} nodes)",
            trigger.name,
            trigger.nodes().len()
        );
    }
    for var in &strategy.user_vars {
        println!("Variable:      {}", var.name);
    }
    println!("Combinations:  {}", strategy.combination_count());

    eprintln!("Strategy is valid.");
    Ok(())
}

fn run_info(series_path: &Path) -> Result<(), StrategistError> {
    let series = load_series(series_path)?;
    let (first, last) = match (series.first(), series.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(SeriesError::Empty.into()),
    };

    println!("Samples:       {}", series.len());
    println!("First:         x = {}, y = {}", first.x, first.y);
    println!("Last:          x = {}, y = {}", last.x, last.y);
    println!("Granularity:   {}", series.granularity);
    match series.is_evenly_spaced(DEFAULT_SPACING_TOLERANCE_PCT) {
        Ok((even, average)) => {
            println!("Avg spacing:   {}", average);
            println!("Evenly spaced: {}", even);
        }
        Err(e) => println!("Spacing:       n/a ({})", e),
    }
    Ok(())
}

fn run_filter(strategy_path: &Path, series_path: &Path, output_path: &Path) -> Result<(), StrategistError> {
    let strategy = load_strategy(strategy_path)?;
    validate_strategy(&strategy)?;
    let series = load_series(series_path)?;

    let (filtered, skipped) = filter_series(&strategy.filters, &series)?;
    for s in &skipped {
        eprintln!("warning: skipped filter {} ({}): {}", s.position, s.filter, s.reason);
    }
    write_series_file(&filtered, output_path)?;
    eprintln!(
        "Wrote {} samples to {}",
        filtered.len(),
        output_path.display()
    );
    Ok(())
}

/// Midnight at the start of `start` through the last second of `end`.
fn date_range(asset: &str, start: NaiveDate, end: NaiveDate) -> Result<(DateTime<Utc>, DateTime<Utc>), StrategistError> {
    if end < start {
        return Err(StrategistError::DataSource {
            asset: asset.to_string(),
            reason: format!("end date {} is before start date {}", end, start),
        });
    }
    let from = start.and_time(NaiveTime::MIN).and_utc();
    let to = end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::seconds(1);
    Ok((from, to))
}

fn chunk_length(asset: &str, days: i64) -> Result<Duration, StrategistError> {
    Duration::try_days(days).ok_or_else(|| StrategistError::DataSource {
        asset: asset.to_string(),
        reason: format!("chunk of {} days is out of range", days),
    })
}

fn price_source(data_dir: &Path, format: DataFormat) -> Box<dyn PriceHistoryPort> {
    match format {
        DataFormat::Json => Box::new(JsonSeriesAdapter::new(data_dir.to_path_buf())),
        DataFormat::Csv => Box::new(CsvAdapter::new(data_dir.to_path_buf())),
    }
}

fn run_fetch(
    data_dir: &Path,
    format: DataFormat,
    asset: &str,
    (start, end): (NaiveDate, NaiveDate),
    granularity: f64,
    chunk_days: Option<i64>,
    output_path: &Path,
) -> Result<(), StrategistError> {
    let (from, to) = date_range(asset, start, end)?;
    let source = price_source(data_dir, format);
    let series = match chunk_days {
        Some(days) => {
            let chunk = chunk_length(asset, days)?;
            source.get_price_history_chunked(asset, from, to, granularity, chunk)?
        }
        None => source.get_price_history(asset, from, to, granularity)?,
    };
    if series.is_empty() {
        tracing::warn!(asset, %from, %to, "no samples in range");
    }
    write_series_file(&series, output_path)?;
    eprintln!(
        "Wrote {} samples of {} to {}",
        series.len(),
        asset,
        output_path.display()
    );
    Ok(())
}

fn run_assets(data_dir: &Path, format: DataFormat) -> Result<(), StrategistError> {
    let assets = match format {
        DataFormat::Json => JsonSeriesAdapter::new(data_dir.to_path_buf()).list_assets()?,
        DataFormat::Csv => CsvAdapter::new(data_dir.to_path_buf()).list_assets()?,
    };
    if assets.is_empty() {
        eprintln!("No assets found in {}", data_dir.display());
    } else {
        for asset in &assets {
            println!("{}", asset);
        }
        eprintln!("{} assets found", assets.len());
    }
    Ok(())
}
