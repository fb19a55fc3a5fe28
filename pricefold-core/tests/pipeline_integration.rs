//! End-to-end tests: partition tree in, transformed partition tree out.

use chrono::NaiveDate;
use polars::prelude::*;
use pricefold_core::domain::{PriceRecord, TickerSeries, YearMonth};
use pricefold_core::pipeline::{Outcome, Pipeline, PipelineConfig, PipelineError};
use pricefold_core::schema::SchemaContract;
use pricefold_core::storage::frame::records_to_frame;
use pricefold_core::storage::{read_partition, write_frame, write_series, PartitionLayout, StoreError, YearRange};
use pricefold_core::validate::ValidationError;
use std::path::Path;

// ── Fixtures ─────────────────────────────────────────────────────────

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2022, m, d).unwrap()
}

fn bar(ticker: &str, m: u32, d: u32, close: f64, dividends: f64, split: f64) -> PriceRecord {
    PriceRecord {
        date: date(m, d),
        ticker: ticker.into(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1_000,
        adj_close: close,
        dividends,
        stock_splits: split,
    }
}

/// ABC over three months with a 2-for-1 split on the first February bar.
fn abc_adjusted() -> Vec<PriceRecord> {
    vec![
        bar("ABC", 1, 3, 50.0, 0.0, 0.0),
        bar("ABC", 1, 4, 51.0, 0.0, 0.0),
        bar("ABC", 2, 1, 52.0, 0.0, 2.0),
        bar("ABC", 2, 2, 53.0, 0.0, 0.0),
        bar("ABC", 3, 1, 54.0, 0.0, 0.0),
    ]
}

fn seed(dir: &Path, ticker: &str, records: Vec<PriceRecord>) {
    let series = TickerSeries::new(ticker, records).unwrap();
    write_series(&series, &PartitionLayout::new(dir), &SchemaContract::default(), None).unwrap();
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig::new(
        root.join("in"),
        root.join("out"),
        YearRange::new(2022, 2022).unwrap(),
    )
}

// ── Reconstruct ──────────────────────────────────────────────────────

#[test]
fn reconstruct_doubles_pre_split_month_only() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());

    let pipeline = Pipeline::new(config(root.path())).unwrap();
    let outcome = pipeline.reconstruct_raw("ABC").unwrap();

    let Outcome::Persisted { files } = outcome else {
        panic!("expected persisted outcome");
    };
    let out = PartitionLayout::new(root.path().join("out"));
    assert_eq!(
        files,
        vec![
            out.ticker_path(YearMonth::new(2022, 1), "ABC"),
            out.ticker_path(YearMonth::new(2022, 2), "ABC"),
            out.ticker_path(YearMonth::new(2022, 3), "ABC"),
        ]
    );

    let contract = SchemaContract::default();
    let jan = read_partition(&files[0], &contract).unwrap();
    assert_eq!(jan[0].close, 100.0);
    assert_eq!(jan[1].close, 102.0);
    assert_eq!(jan[0].open, 98.0);
    assert_eq!(jan[0].volume, 1_000);

    let feb = read_partition(&files[1], &contract).unwrap();
    assert_eq!(feb[0].close, 52.0);
    assert_eq!(feb[1].close, 53.0);

    let mar = read_partition(&files[2], &contract).unwrap();
    assert_eq!(mar[0].close, 54.0);
}

#[test]
fn reconstruct_is_idempotent_on_disk() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());
    let pipeline = Pipeline::new(config(root.path())).unwrap();

    let first = pipeline.reconstruct_raw("ABC").unwrap();
    let before: Vec<Vec<u8>> = first
        .written_files()
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

    let second = pipeline.reconstruct_raw("ABC").unwrap();
    let after: Vec<Vec<u8>> = second
        .written_files()
        .iter()
        .map(|p| std::fs::read(p).unwrap())
        .collect();

    assert_eq!(first.written_files(), second.written_files());
    assert_eq!(before, after);
}

#[test]
fn dry_run_keeps_factor_columns_in_memory() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());

    let mut cfg = config(root.path());
    cfg.persist = false;
    cfg.drop_factor_columns = false;
    let pipeline = Pipeline::new(cfg).unwrap();

    let raw = pipeline.reconstruct_raw("ABC").unwrap().into_series().unwrap();
    let factors = raw.factors.as_ref().unwrap();
    assert_eq!(factors.cum_adj_factor, vec![2.0, 2.0, 1.0, 1.0, 1.0]);
    assert_eq!(factors.adjust_factor, vec![1.0, 1.0, 2.0, 1.0, 1.0]);

    let df = raw.to_frame(&SchemaContract::default()).unwrap();
    assert!(df.column("cum_adj_factor").is_ok());
    assert!(!root.path().join("out").exists());
}

#[test]
fn missing_ticker_is_no_data_without_writes() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());
    let pipeline = Pipeline::new(config(root.path())).unwrap();

    assert!(pipeline.reconstruct_raw("ZZZ").unwrap().is_no_data());
    assert!(pipeline.adjust("ZZZ").unwrap().is_no_data());
    assert!(!root.path().join("out").exists());
}

#[test]
fn years_outside_range_are_not_loaded() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());

    let cfg = PipelineConfig::new(
        root.path().join("in"),
        root.path().join("out"),
        YearRange::new(2019, 2021).unwrap(),
    );
    let pipeline = Pipeline::new(cfg).unwrap();
    assert!(pipeline.reconstruct_raw("ABC").unwrap().is_no_data());
}

// ── Adjust ───────────────────────────────────────────────────────────

#[test]
fn adjust_inverts_reconstruct_for_splits() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());

    let pipeline = Pipeline::new(config(root.path())).unwrap();
    pipeline.reconstruct_raw("ABC").unwrap();

    // Adjust reads the reconstructed tree
    let mut cfg = PipelineConfig::new(
        root.path().join("out"),
        root.path().join("readjusted"),
        YearRange::new(2022, 2022).unwrap(),
    );
    cfg.persist = false;
    let adjusted = Pipeline::new(cfg)
        .unwrap()
        .adjust("ABC")
        .unwrap()
        .into_series()
        .unwrap();

    let closes: Vec<f64> = adjusted.series.records().iter().map(|r| r.close).collect();
    assert_eq!(closes, vec![50.0, 51.0, 52.0, 53.0, 54.0]);
    assert_eq!(adjusted.dividend.accum_retention, vec![1.0; 5]);
    let adj: Vec<f64> = adjusted.series.records().iter().map(|r| r.adj_close).collect();
    assert_eq!(adj, closes);
}

#[test]
fn dividend_discounts_earlier_adj_close() {
    let root = tempfile::tempdir().unwrap();
    seed(
        &root.path().join("in"),
        "DIV",
        vec![
            bar("DIV", 1, 3, 100.0, 0.0, 0.0),
            bar("DIV", 1, 4, 100.0, 1.0, 0.0),
            bar("DIV", 1, 5, 100.0, 0.0, 0.0),
        ],
    );
    let mut cfg = config(root.path());
    cfg.persist = false;

    let adjusted = Pipeline::new(cfg)
        .unwrap()
        .adjust("DIV")
        .unwrap()
        .into_series()
        .unwrap();

    assert_eq!(adjusted.dividend.fwd_div, vec![1.0, 0.0, 0.0]);
    let recs = adjusted.series.records();
    assert!((recs[0].adj_close - 99.0).abs() < 1e-9);
    assert_eq!(recs[1].adj_close, 100.0);
    assert_eq!(recs[2].adj_close, 100.0);
}

#[test]
fn degenerate_close_is_rejected_before_write() {
    let root = tempfile::tempdir().unwrap();
    seed(
        &root.path().join("in"),
        "ZERO",
        vec![bar("ZERO", 1, 3, 0.0, 0.0, 0.0), bar("ZERO", 1, 4, 10.0, 0.5, 0.0)],
    );
    let mut cfg = config(root.path());
    cfg.reject_degenerate = true;

    let err = Pipeline::new(cfg).unwrap().adjust("ZERO").unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Rejected {
            source: ValidationError::NonFinite { .. },
            ..
        }
    ));
    assert!(!root.path().join("out").exists());
}

// ── Batches ──────────────────────────────────────────────────────────

#[test]
fn batch_keeps_input_order_and_placeholders() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("in");
    seed(&input, "ABC", abc_adjusted());
    seed(&input, "XYZ", vec![bar("XYZ", 2, 1, 10.0, 0.0, 0.0)]);

    for parallel in [false, true] {
        let mut cfg = config(root.path());
        cfg.persist = false;
        cfg.parallel = parallel;
        let report = Pipeline::new(cfg)
            .unwrap()
            .reconstruct_raw_batch(&["XYZ".into(), "NONE".into(), "ABC".into()]);

        assert_eq!(report.total(), 3);
        assert_eq!(report.no_data(), 1);
        assert!(report.all_succeeded());

        let tickers: Vec<_> = report.outcomes.iter().map(|o| o.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["XYZ", "NONE", "ABC"]);

        let series = report.into_series();
        assert_eq!(series[0].as_ref().unwrap().series.len(), 1);
        assert!(series[1].is_none());
        assert_eq!(series[2].as_ref().unwrap().series.len(), 5);
    }
}

#[test]
fn schema_mismatch_fails_one_ticker_and_batch_continues() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("in");
    seed(&input, "ABC", abc_adjusted());

    // BAD stores close as text
    let contract = SchemaContract::default();
    let mut df = records_to_frame(&[bar("BAD", 1, 3, 1.0, 0.0, 0.0)], &contract, Vec::new()).unwrap();
    df.with_column(Column::new("close".into(), vec!["n/a"])).unwrap();
    let layout = PartitionLayout::new(&input);
    write_frame(&df, &layout.ticker_path(YearMonth::new(2022, 1), "BAD")).unwrap();

    let report = Pipeline::new(config(root.path()))
        .unwrap()
        .reconstruct_raw_batch(&["BAD".into(), "ABC".into()]);

    assert_eq!(report.failed(), 1);
    assert_eq!(report.succeeded(), 1);
    let (ticker, err) = report.errors().next().unwrap();
    assert_eq!(ticker, "BAD");
    assert!(matches!(
        err,
        PipelineError::Store {
            source: StoreError::Schema { .. },
            ..
        }
    ));

    let out = PartitionLayout::new(root.path().join("out"));
    assert!(out.ticker_path(YearMonth::new(2022, 1), "ABC").exists());
    assert!(!out.ticker_path(YearMonth::new(2022, 1), "BAD").exists());
}

#[test]
fn zoned_index_stays_in_its_local_month() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("in");
    seed(&input, "BK", vec![bar("BK", 1, 31, 10.0, 0.0, 0.0)]);

    // February bars stored the way a zoned download writes them:
    // local midnight in Asia/Bangkok, physically the previous UTC evening
    let contract = SchemaContract::default();
    let feb = [bar("BK", 2, 1, 20.0, 0.0, 2.0), bar("BK", 2, 2, 21.0, 0.0, 0.0)];
    let mut df = records_to_frame(&feb, &contract, Vec::new()).unwrap();
    let bangkok_feb_first_ms = 1_643_648_400_000i64;
    let index = Column::new("date".into(), &[bangkok_feb_first_ms, bangkok_feb_first_ms + 86_400_000])
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, Some("Asia/Bangkok".into())))
        .unwrap();
    df.with_column(index).unwrap();
    let layout = PartitionLayout::new(&input);
    write_frame(&df, &layout.ticker_path(YearMonth::new(2022, 2), "BK")).unwrap();

    let files = match Pipeline::new(config(root.path())).unwrap().reconstruct_raw("BK").unwrap() {
        Outcome::Persisted { files } => files,
        _ => panic!("expected persisted outcome"),
    };
    assert_eq!(files.len(), 2);

    let jan = read_partition(&files[0], &contract).unwrap();
    assert_eq!(jan.len(), 1);
    assert_eq!(jan[0].date, date(1, 31));
    assert_eq!(jan[0].close, 20.0);

    let feb = read_partition(&files[1], &contract).unwrap();
    let dates: Vec<_> = feb.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(2, 1), date(2, 2)]);
    assert_eq!(feb[0].close, 20.0);
}

#[test]
fn config_file_drives_the_pipeline() {
    let root = tempfile::tempdir().unwrap();
    seed(&root.path().join("in"), "ABC", abc_adjusted());

    let toml = format!(
        r#"
source_dir = "{}"
dest_dir = "{}"
first_year = 2022
last_year = 2022
columns = ["close"]
persist = false
"#,
        root.path().join("in").display(),
        root.path().join("out").display()
    );
    let cfg = PipelineConfig::from_toml(&toml).unwrap();
    let raw = Pipeline::new(cfg)
        .unwrap()
        .reconstruct_raw("ABC")
        .unwrap()
        .into_series()
        .unwrap();

    let first = &raw.series.records()[0];
    assert_eq!(first.close, 100.0);
    // open was not selected
    assert_eq!(first.open, 49.0);
}
