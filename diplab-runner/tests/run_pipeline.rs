//! End-to-end runs: CSV and TOML files on disk through the runner and reporter.

use std::fs;
use std::path::Path;

use diplab_core::{DipBuyParams, ScaleOutParams, StrategyParams, TradeEvent};
use diplab_runner::{
    load_bars, render, run_config, run_file, ErrorKind, RunConfig, RunError,
};

const HEADER: &str = "unix,date,symbol,open,high,low,close,Volume BTC,Volume USDT,buyTakerAmount,buyTakerQuantity,tradeCount,weightedAverage";

/// One hourly row starting at 2024-03-01 00:00:00.
fn row(hour: u32, high: f64, low: f64) -> String {
    let mid = (high + low) / 2.0;
    format!(
        "{},2024-03-01 {hour:02}:00:00,BTCUSDT,{mid},{high},{low},{mid},2.5,{},1.2,{},37,{mid}",
        1_709_251_200 + i64::from(hour) * 3_600,
        2.5 * mid,
        1.2 * mid,
    )
}

fn write_csv(dir: &Path, name: &str, rows: &[String]) -> std::path::PathBuf {
    let path = dir.join(name);
    let mut body = String::from(HEADER);
    for r in rows {
        body.push('\n');
        body.push_str(r);
    }
    body.push('\n');
    fs::write(&path, body).unwrap();
    path
}

fn scale_out_rows() -> Vec<String> {
    vec![
        row(0, 100.0, 100.0),
        row(1, 100.0, 80.0),
        row(2, 125.0, 110.0),
        row(3, 124.0, 118.0),
    ]
}

#[test]
fn scale_out_file_sells_before_buying_on_same_bar() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), "btc.csv", &scale_out_rows());
    let strategy = StrategyParams::ScaleOut(ScaleOutParams {
        dip_fraction: 0.9,
        purchase_amount: 1000.0,
        profit_fraction: 1.2,
        sell_fraction: 0.5,
    });

    let result = run_file(&strategy, &csv).unwrap();
    assert_eq!(result.series.bar_count, 4);

    let sides: Vec<bool> = result.events.iter().map(TradeEvent::is_purchase).collect();
    assert_eq!(sides, vec![true, false, true]);

    let sale = result.events[1].as_sale().unwrap();
    assert_eq!(sale.price, 125.0);
    assert!((sale.btc_sold - 6.25).abs() < 1e-12);
    assert!((sale.remaining_holdings - 6.25).abs() < 1e-12);

    let second = result.events[2].as_purchase().unwrap();
    assert_eq!(second.price, 110.0);
    assert!((second.dollars_spent - 1000.0 * 3f64.log2()).abs() < 1e-9);

    let summary = result.summary();
    assert_eq!(summary.purchase_count, 2);
    assert_eq!(summary.sale_count, 1);
    assert!((summary.dollars_received - 781.25).abs() < 1e-9);
}

#[test]
fn config_file_resolves_relative_data_path() {
    let dir = tempfile::tempdir().unwrap();
    write_csv(dir.path(), "btc.csv", &scale_out_rows());
    let config_path = dir.path().join("run.toml");
    fs::write(
        &config_path,
        r#"
[data]
path = "btc.csv"

[strategy]
type = "dip_buy"
dip_fraction = 0.9
purchase_amount = 500.0

[report]
transcript = true
"#,
    )
    .unwrap();

    let config = RunConfig::from_file(&config_path).unwrap();
    assert_eq!(config.data.path, dir.path().join("btc.csv"));

    let result = run_config(&config).unwrap();
    let purchases: Vec<f64> = result.events.iter().map(TradeEvent::price).collect();
    assert_eq!(purchases, vec![80.0, 110.0]);

    let text = render(&result, config.report.transcript).unwrap();
    assert!(text.contains("Total purchases made: 2"));
    assert!(text.contains("Total USD spent: $1,000.00"));
    assert!(text.contains("Trade history"));
    assert!(text.contains("Date: 2024-03-01 01:00:00"));
}

#[test]
fn streaming_and_loaded_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), "btc.csv", &scale_out_rows());
    let strategy = StrategyParams::ScaleOut(ScaleOutParams::default());

    let streamed = run_file(&strategy, &csv).unwrap();
    let loaded = strategy.simulate(load_bars(&csv).unwrap()).unwrap();
    assert_eq!(streamed.events, loaded);
}

#[test]
fn header_only_file_yields_no_events() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(dir.path(), "empty.csv", &[]);
    let result = run_file(&StrategyParams::DipBuy(DipBuyParams::default()), &csv).unwrap();
    assert_eq!(result.series.bar_count, 0);
    assert!(result.events.is_empty());
    assert!(render(&result, true).unwrap().contains("(no trades)"));
}

#[test]
fn out_of_order_rows_are_processed_in_file_order() {
    let dir = tempfile::tempdir().unwrap();
    let csv = write_csv(
        dir.path(),
        "shuffled.csv",
        &[row(5, 100.0, 100.0), row(1, 100.0, 90.0), row(2, 101.0, 100.0)],
    );
    let result = run_file(&StrategyParams::DipBuy(DipBuyParams::default()), &csv).unwrap();
    assert_eq!(result.series.bar_count, 3);
    assert_eq!(result.events.len(), 1);
    assert_eq!(result.events[0].price(), 90.0);
}

#[test]
fn bad_row_reports_its_line() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = scale_out_rows();
    rows.push("1709265600,2024-03-01 04:00:00,BTCUSDT,100,90,95,92,2.5,250,1.2,120,37,93".into());
    let csv = write_csv(dir.path(), "bad.csv", &rows);

    let err = run_file(&StrategyParams::DipBuy(DipBuyParams::default()), &csv).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(err.to_string().contains("line 6"), "{err}");
}

#[test]
fn missing_column_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    fs::write(&path, "unix,date,symbol,open,high,low,close\n").unwrap();

    let err = run_file(&StrategyParams::DipBuy(DipBuyParams::default()), &path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MalformedInput);
    assert!(err.to_string().contains("Volume BTC"), "{err}");
}

#[test]
fn config_errors_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[strategy]\ntype = \"dip_buy\"\n").unwrap();

    let parse = RunError::from(RunConfig::from_file(&path).unwrap_err());
    assert_eq!(parse.kind(), ErrorKind::InvalidParameter);

    let missing = RunError::from(RunConfig::from_file(&dir.path().join("none.toml")).unwrap_err());
    assert_eq!(missing.kind(), ErrorKind::ResourceUnavailable);
}
