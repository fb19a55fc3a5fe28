//! Pricefold CLI — reconstruct, adjust, import and partition listing commands.
//!
//! Commands:
//! - `reconstruct` — undo split adjustment and write raw prices
//! - `adjust` — apply split and dividend adjustment (in memory unless `--persist`)
//! - `partitions` — list the partition files a ticker and year range resolve to
//! - `import` — load a price CSV into the `{year}/{month}/{ticker}.parquet` store

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pricefold_core::domain::PriceField;
use pricefold_core::ingest::import_csv;
use pricefold_core::pipeline::{BatchReport, Outcome, Pipeline, PipelineConfig};
use pricefold_core::schema::{SchemaContract, DEFAULT_INDEX_COLUMN};
use pricefold_core::storage::{PartitionLayout, YearRange};
use pricefold_core::transform::{AdjustedSeries, RawSeries};
use pricefold_core::TickerSeries;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "pricefold",
    about = "Pricefold CLI — split and dividend adjustment over a monthly parquet store"
)]
struct Cli {
    /// Log level when RUST_LOG is unset (error, warn, info, debug, trace).
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct raw (split-unadjusted) prices from adjusted partitions.
    Reconstruct {
        /// Tickers to process.
        #[arg(required = true)]
        tickers: Vec<String>,

        #[command(flatten)]
        run: RunArgs,

        /// Keep the adjust_factor and cum_adj_factor columns in the result.
        #[arg(long, default_value_t = false)]
        keep_factors: bool,

        /// Compute without writing to the destination.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Adjust raw prices for splits and dividends.
    Adjust {
        /// Tickers to process.
        #[arg(required = true)]
        tickers: Vec<String>,

        #[command(flatten)]
        run: RunArgs,

        /// Write adjusted partitions to the destination. A config file with
        /// `persist = true` also writes.
        #[arg(long, default_value_t = false)]
        persist: bool,
    },
    /// List the partition files resolved for a year range.
    Partitions {
        /// Only this ticker. Defaults to every ticker found.
        #[arg(long)]
        ticker: Option<String>,

        /// Root of the partition tree.
        #[arg(long)]
        source: PathBuf,

        /// First year (inclusive).
        #[arg(long)]
        first_year: i32,

        /// Last year (inclusive).
        #[arg(long)]
        last_year: i32,
    },
    /// Import a price CSV into the partitioned store.
    Import {
        /// CSV file following the price schema.
        csv: PathBuf,

        /// Ticker the rows belong to.
        #[arg(long)]
        ticker: String,

        /// Root of the partition tree to write into.
        #[arg(long)]
        dest: PathBuf,

        /// Only write months from this date's month on (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,

        /// Name of the date index column.
        #[arg(long, default_value = DEFAULT_INDEX_COLUMN)]
        index_column: String,
    },
}

/// Flags shared by `reconstruct` and `adjust`. Each one overrides `--config`.
#[derive(Args)]
struct RunArgs {
    /// TOML pipeline config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root of the input partition tree.
    #[arg(long)]
    source: Option<PathBuf>,

    /// Root the results are written under.
    #[arg(long)]
    dest: Option<PathBuf>,

    /// First year to load (inclusive).
    #[arg(long)]
    first_year: Option<i32>,

    /// Last year to load (inclusive).
    #[arg(long)]
    last_year: Option<i32>,

    /// Columns rewritten by the split factor, comma separated.
    #[arg(long, value_delimiter = ',')]
    columns: Option<Vec<PriceField>>,

    /// Column holding split ratios.
    #[arg(long)]
    split_column: Option<PriceField>,

    /// Process tickers on all cores.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Refuse to write series containing NaN or infinite values.
    #[arg(long, default_value_t = false)]
    reject_degenerate: bool,
}

impl RunArgs {
    /// Merge the config file (if any) with the command-line overrides.
    fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => {
                let (Some(source), Some(dest), Some(first), Some(last)) =
                    (&self.source, &self.dest, self.first_year, self.last_year)
                else {
                    bail!("--source, --dest, --first-year and --last-year are required without --config");
                };
                PipelineConfig::new(source, dest, YearRange::new(first, last)?)
            }
        };

        if let Some(source) = self.source {
            config.source_dir = source;
        }
        if let Some(dest) = self.dest {
            config.dest_dir = dest;
        }
        if let Some(first) = self.first_year {
            config.first_year = first;
        }
        if let Some(last) = self.last_year {
            config.last_year = last;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if let Some(split) = self.split_column {
            config.split_column = split;
        }
        config.parallel |= self.parallel;
        config.reject_degenerate |= self.reject_degenerate;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Reconstruct {
            tickers,
            run,
            keep_factors,
            dry_run,
        } => run_reconstruct(tickers, run, keep_factors, dry_run),
        Commands::Adjust {
            tickers,
            run,
            persist,
        } => run_adjust(tickers, run, persist),
        Commands::Partitions {
            ticker,
            source,
            first_year,
            last_year,
        } => run_partitions(ticker, source, first_year, last_year),
        Commands::Import {
            csv,
            ticker,
            dest,
            since,
            index_column,
        } => run_import(csv, ticker, dest, since, index_column),
    }
}

/// `RUST_LOG` wins over `--log` when set.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_reconstruct(tickers: Vec<String>, run: RunArgs, keep_factors: bool, dry_run: bool) -> Result<()> {
    let mut config = run.into_config()?;
    config.drop_factor_columns &= !keep_factors;
    config.persist &= !dry_run;

    tracing::info!(tickers = tickers.len(), persist = config.persist, "starting reconstruct");
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.reconstruct_raw_batch(&tickers);
    print_report(&report, |raw: &RawSeries| describe(&raw.series));
    exit_on_failure(&report);
    Ok(())
}

/// Adjusted results stay in memory unless `--persist` or the config file's
/// `persist = true` asks for a write.
fn adjust_config(run: RunArgs, persist: bool) -> Result<PipelineConfig> {
    let from_file = run.config.is_some();
    let mut config = run.into_config()?;
    config.persist = persist || (from_file && config.persist);
    Ok(config)
}

fn run_adjust(tickers: Vec<String>, run: RunArgs, persist: bool) -> Result<()> {
    let config = adjust_config(run, persist)?;

    tracing::info!(tickers = tickers.len(), persist = config.persist, "starting adjust");
    let pipeline = Pipeline::new(config)?;
    let report = pipeline.adjust_batch(&tickers);
    print_report(&report, |adjusted: &AdjustedSeries| {
        let last_accum = adjusted
            .dividend
            .accum_retention
            .first()
            .copied()
            .unwrap_or(1.0);
        format!(
            "{}, oldest accum_retention {last_accum:.6}",
            describe(&adjusted.series)
        )
    });
    exit_on_failure(&report);
    Ok(())
}

fn run_partitions(ticker: Option<String>, source: PathBuf, first_year: i32, last_year: i32) -> Result<()> {
    let years = YearRange::new(first_year, last_year)?;
    let layout = PartitionLayout::new(source);
    let files = layout.resolve(ticker.as_deref(), years)?;

    if files.is_empty() {
        println!("No partitions found in {}..={}", years.first(), years.last());
        return Ok(());
    }

    println!("{:<10} {:<8} Path", "Ticker", "Month");
    println!("{}", "-".repeat(60));
    for file in &files {
        println!(
            "{:<10} {:<8} {}",
            file.ticker,
            file.year_month.to_string(),
            file.path.display()
        );
    }
    println!("\n{} file(s)", files.len());
    Ok(())
}

fn run_import(
    csv: PathBuf,
    ticker: String,
    dest: PathBuf,
    since: Option<String>,
    index_column: String,
) -> Result<()> {
    let since = since
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--since must be YYYY-MM-DD")?;

    let layout = PartitionLayout::new(dest);
    let contract = SchemaContract::new(index_column);
    let files = import_csv(&csv, &ticker, &layout, &contract, since)
        .with_context(|| format!("importing {}", csv.display()))?;

    println!("Imported {ticker}: {} partition(s) written", files.len());
    for path in &files {
        println!("  {}", path.display());
    }
    Ok(())
}

fn describe(series: &TickerSeries) -> String {
    match (series.first_date(), series.last_date()) {
        (Some(first), Some(last)) => format!("{} rows, {first} to {last}", series.len()),
        _ => "0 rows".to_string(),
    }
}

fn print_report<T>(report: &BatchReport<T>, summarize: impl Fn(&T) -> String) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(Outcome::NoData) => println!("{:<10} no data in range", outcome.ticker),
            Ok(Outcome::Persisted { files }) => {
                println!("{:<10} wrote {} partition(s)", outcome.ticker, files.len())
            }
            Ok(Outcome::InMemory(series)) => {
                println!("{:<10} {}", outcome.ticker, summarize(series))
            }
            Err(e) => eprintln!("{:<10} error: {e}", outcome.ticker),
        }
    }
    println!(
        "\n{} ticker(s): {} ok, {} no data, {} failed",
        report.total(),
        report.succeeded(),
        report.no_data(),
        report.failed()
    );
}

fn exit_on_failure<T>(report: &BatchReport<T>) {
    if !report.all_succeeded() {
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn reconstruct_flags_build_a_config() {
        let cli = parse(&[
            "pricefold",
            "reconstruct",
            "ABC",
            "XYZ",
            "--source",
            "in",
            "--dest",
            "out",
            "--first-year",
            "2021",
            "--last-year",
            "2022",
            "--columns",
            "open,close",
        ]);
        let Commands::Reconstruct { tickers, run, .. } = cli.command else {
            panic!("expected reconstruct");
        };
        assert_eq!(tickers, vec!["ABC", "XYZ"]);

        let config = run.into_config().unwrap();
        assert_eq!(config.source_dir, PathBuf::from("in"));
        assert_eq!(config.first_year, 2021);
        assert_eq!(config.columns, vec![PriceField::Open, PriceField::Close]);
        assert!(config.persist);
        assert!(!config.parallel);
    }

    #[test]
    fn missing_paths_without_config_fail() {
        let cli = parse(&["pricefold", "adjust", "ABC", "--first-year", "2022", "--last-year", "2022"]);
        let Commands::Adjust { run, .. } = cli.command else {
            panic!("expected adjust");
        };
        assert!(run.into_config().is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "source_dir = \"a\"\ndest_dir = \"b\"\nfirst_year = 2020\nlast_year = 2021\n",
        )
        .unwrap();

        let cli = parse(&[
            "pricefold",
            "adjust",
            "ABC",
            "--config",
            path.to_str().unwrap(),
            "--last-year",
            "2023",
            "--parallel",
        ]);
        let Commands::Adjust { run, persist, .. } = cli.command else {
            panic!("expected adjust");
        };
        let config = adjust_config(run, persist).unwrap();
        assert_eq!(config.source_dir, PathBuf::from("a"));
        assert_eq!(config.last_year, 2023);
        assert!(config.parallel);
        // persist defaults to true in the file and is honoured
        assert!(config.persist);
    }

    #[test]
    fn adjust_stays_in_memory_without_persist() {
        let cli = parse(&[
            "pricefold", "adjust", "ABC", "--source", "in", "--dest", "out", "--first-year", "2022",
            "--last-year", "2022",
        ]);
        let Commands::Adjust { run, persist, .. } = cli.command else {
            panic!("expected adjust");
        };
        assert!(!adjust_config(run, persist).unwrap().persist);
    }

    #[test]
    fn adjust_config_file_can_opt_out_of_persisting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "source_dir = \"a\"\ndest_dir = \"b\"\nfirst_year = 2020\nlast_year = 2021\npersist = false\n",
        )
        .unwrap();

        let cli = parse(&["pricefold", "adjust", "ABC", "--config", path.to_str().unwrap()]);
        let Commands::Adjust { run, persist, .. } = cli.command else {
            panic!("expected adjust");
        };
        assert!(!adjust_config(run, persist).unwrap().persist);

        let cli = parse(&["pricefold", "adjust", "ABC", "--config", path.to_str().unwrap(), "--persist"]);
        let Commands::Adjust { run, persist, .. } = cli.command else {
            panic!("expected adjust");
        };
        assert!(adjust_config(run, persist).unwrap().persist);
    }

    #[test]
    fn inverted_year_range_is_rejected() {
        let cli = parse(&[
            "pricefold", "reconstruct", "ABC", "--source", "in", "--dest", "out", "--first-year", "2023",
            "--last-year", "2020",
        ]);
        let Commands::Reconstruct { run, .. } = cli.command else {
            panic!("expected reconstruct");
        };
        assert!(run.into_config().is_err());
    }

    #[test]
    fn log_level_defaults_to_warn() {
        let cli = parse(&["pricefold", "partitions", "--source", "s", "--first-year", "2022", "--last-year", "2022"]);
        assert_eq!(cli.log, "warn");
    }
}
