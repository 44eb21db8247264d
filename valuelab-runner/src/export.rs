//! Reporting and export: JSON and CSV artifacts plus the console summary.
//!
//! Artifacts for a run:
//! - **manifest.json**: full `BacktestResult`, schema-versioned
//! - **equity.csv**: per-period value, drawdown and benchmark
//! - **trades.csv**: the trade tape
//!
//! Unknown schema versions are rejected on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use valuelab_core::domain::TradeRecord;

use crate::runner::{BacktestResult, SCHEMA_VERSION};
use crate::sweep::{RankMetric, SweepResults};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Trade tape.
///
/// Columns: exit_date, ticker, pnl_percent, reason, entry_date, entry_price,
/// exit_price, shares
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "exit_date",
        "ticker",
        "pnl_percent",
        "reason",
        "entry_date",
        "entry_price",
        "exit_price",
        "shares",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.exit_date.to_string(),
            &t.ticker,
            &format!("{:.6}", t.pnl_percent),
            &t.reason.to_string(),
            &t.entry_date.to_string(),
            &format!("{:.4}", t.entry_price),
            &format!("{:.4}", t.exit_price),
            &t.shares.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-period equity curve: date, portfolio_value, drawdown, benchmark.
///
/// `benchmark` is empty where the index has no close.
pub fn export_equity_csv(result: &BacktestResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "portfolio_value", "drawdown", "benchmark"])?;
    for (i, snap) in result.snapshots.iter().enumerate() {
        let drawdown = result.drawdown.get(i).copied().unwrap_or(0.0);
        let benchmark = result
            .benchmark
            .get(i)
            .copied()
            .flatten()
            .map(|b| format!("{b:.2}"))
            .unwrap_or_default();
        wtr.write_record([
            &snap.date.to_string(),
            &format!("{:.2}", snap.portfolio_value),
            &format!("{drawdown:.6}"),
            &benchmark,
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per sweep run, best first by `metric`.
pub fn export_sweep_csv(sweep: &SweepResults, metric: RankMetric) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "run_id",
        "buy_threshold",
        "allocation_per_stock",
        "trail_stop_percent",
        "min_profit_for_trail",
        "max_positions",
        "total_return",
        "sharpe",
        "max_drawdown",
        "win_rate",
        "profit_factor",
        "trade_count",
    ])?;
    for (rank, r) in sweep.ranked_by(metric).into_iter().enumerate() {
        let c = &r.config;
        let m = &r.metrics;
        wtr.write_record([
            &(rank + 1).to_string(),
            &r.run_id,
            &c.buy_threshold.to_string(),
            &c.allocation_per_stock.to_string(),
            &c.trail_stop_percent.to_string(),
            &c.min_profit_for_trail.to_string(),
            &c.max_positions.to_string(),
            &format!("{:.6}", m.total_return),
            &format!("{:.4}", m.sharpe),
            &format!("{:.6}", m.max_drawdown),
            &format!("{:.4}", m.win_rate),
            &format_ratio(m.profit_factor),
            &m.trade_count.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single backtest run.
///
/// Creates `{run_id[..12]}_{timestamp}/` under `output_dir` containing
/// `manifest.json`, `equity.csv` and `trades.csv`. Returns the directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let dirname = format!(
        "{}_{}",
        short_id,
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(run_dir.join("equity.csv"), export_equity_csv(result)?)?;
    std::fs::write(run_dir.join("trades.csv"), export_trades_csv(&result.trades)?)?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Console summary ────────────────────────────────────────────────

/// Human-readable run summary for the terminal.
pub fn format_summary(result: &BacktestResult) -> String {
    let m = &result.metrics;
    let mut out = String::with_capacity(1024);

    let _ = writeln!(out, "=== Backtest Results ===");
    if result.has_synthetic {
        let _ = writeln!(out, "Data:             SYNTHETIC");
    }
    let period = match (m.start_date, m.end_date) {
        (Some(s), Some(e)) => format!("{s} -> {e}"),
        _ => "-".into(),
    };
    let _ = writeln!(out, "Period:           {period} ({} periods)", m.period_count);
    let _ = writeln!(
        out,
        "Threshold:        {:.4} ({:?})",
        result.threshold.value, result.threshold.source
    );
    let _ = writeln!(out, "Initial capital:  {}", group_thousands(m.initial_capital));
    let _ = writeln!(out, "Final value:      {}", group_thousands(m.final_value));
    let _ = writeln!(out, "Total return:     {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Max drawdown:     {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Sharpe:           {:.2}", m.sharpe);
    let _ = writeln!(out, "--- Trades ---");
    let _ = writeln!(out, "Trades:           {}", m.trade_count);
    let _ = writeln!(out, "Win rate:         {:.2}%", m.win_rate * 100.0);
    let _ = writeln!(out, "Avg win:          {:.2}%", m.avg_win * 100.0);
    let _ = writeln!(out, "Avg loss:         {:.2}%", m.avg_loss * 100.0);
    let _ = writeln!(out, "Profit factor:    {}", format_ratio(m.profit_factor));
    let _ = writeln!(out, "Still open:       {}", result.open_positions);
    let _ = writeln!(out, "Run ID:           {}", result.run_id);
    let _ = writeln!(out, "Dataset hash:     {}", result.dataset_hash);
    out
}

/// Ratio with `inf` / `n/a` for non-finite values.
pub fn format_ratio(v: f64) -> String {
    if v.is_nan() {
        "n/a".into()
    } else if v.is_infinite() {
        (if v > 0.0 { "inf" } else { "-inf" }).to_string()
    } else {
        format!("{v:.2}")
    }
}

/// Integer part of `v` with comma thousands separators.
pub fn group_thousands(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let digits = format!("{:.0}", v.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if v < 0.0 && digits != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::PerformanceMetrics;
    use crate::threshold::{ThresholdResolution, ThresholdSource};
    use chrono::NaiveDate;
    use valuelab_core::domain::{ExitReason, Snapshot};
    use valuelab_core::engine::{EngineConfig, RunDiagnostics};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn sample_trade() -> TradeRecord {
        TradeRecord {
            exit_date: d(26),
            ticker: "FPT".into(),
            pnl_percent: 0.25,
            reason: ExitReason::TrailingStop,
            entry_date: d(5),
            entry_price: 100.0,
            exit_price: 125.0,
            shares: 1_000,
            holding_days: 21,
        }
    }

    fn sample_result() -> BacktestResult {
        let snapshots = vec![
            Snapshot { date: d(5), portfolio_value: 1_000_000.0, cash: 900_000.0, open_positions: 1 },
            Snapshot { date: d(12), portfolio_value: 1_050_000.0, cash: 900_000.0, open_positions: 1 },
            Snapshot { date: d(19), portfolio_value: 1_020_000.0, cash: 900_000.0, open_positions: 1 },
        ];
        let trades = vec![sample_trade()];
        let metrics = PerformanceMetrics::compute(&snapshots, &trades, 1_000_000.0, 52.0);
        BacktestResult {
            schema_version: SCHEMA_VERSION,
            run_id: "ab".repeat(32),
            dataset_hash: "cd".repeat(32),
            has_synthetic: false,
            config: EngineConfig::default(),
            threshold: ThresholdResolution { value: 0.5399, source: ThresholdSource::Default },
            metrics,
            snapshots,
            trades,
            drawdown: vec![0.0, 0.0, -0.02857142857142858],
            benchmark: vec![Some(1_000_000.0), None, Some(990_000.0)],
            open_positions: 1,
            diagnostics: RunDiagnostics::default(),
        }
    }

    #[test]
    fn json_roundtrip_keeps_non_finite_profit_factor() {
        let result = sample_result();
        let json = export_json(&result).unwrap();
        let back = import_json(&json).unwrap();
        assert_eq!(back.run_id, result.run_id);
        assert_eq!(back.snapshots, result.snapshots);
        assert_eq!(back.trades, result.trades);
        assert_eq!(back.metrics.profit_factor, f64::INFINITY);
    }

    #[test]
    fn json_rejects_unknown_version() {
        let mut result = sample_result();
        result.schema_version = SCHEMA_VERSION + 1;
        let json = serde_json::to_string(&result).unwrap();
        assert!(import_json(&json).is_err());
    }

    #[test]
    fn csv_trades_columns_and_content() {
        let csv = export_trades_csv(&[sample_trade()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "exit_date,ticker,pnl_percent,reason,entry_date,entry_price,exit_price,shares"
        );
        assert_eq!(
            lines.next().unwrap(),
            "2024-01-26,FPT,0.250000,TrailingStop,2024-01-05,100.0000,125.0000,1000"
        );
    }

    #[test]
    fn csv_equity_leaves_missing_benchmark_blank() {
        let csv = export_equity_csv(&sample_result()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,portfolio_value,drawdown,benchmark");
        assert_eq!(lines[1], "2024-01-05,1000000.00,0.000000,1000000.00");
        assert_eq!(lines[2], "2024-01-12,1050000.00,0.000000,");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn save_load_artifacts_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample_result();
        let run_dir = save_artifacts(&result, dir.path()).unwrap();
        assert!(run_dir.join("equity.csv").exists());
        assert!(run_dir.join("trades.csv").exists());
        let back = load_artifacts(&run_dir).unwrap();
        assert_eq!(back.snapshots, result.snapshots);
    }

    #[test]
    fn summary_mentions_key_figures() {
        let text = format_summary(&sample_result());
        assert!(text.contains("2024-01-05 -> 2024-01-19"));
        assert!(text.contains("Final value:      1,020,000"));
        assert!(text.contains("Total return:     2.00%"));
        assert!(text.contains("Profit factor:    inf"));
        assert!(!text.contains("SYNTHETIC"));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(group_thousands(1_000_000_000.0), "1,000,000,000");
        assert_eq!(group_thousands(999.4), "999");
        assert_eq!(group_thousands(-12_345.0), "-12,345");
        assert_eq!(format_ratio(f64::NAN), "n/a");
        assert_eq!(format_ratio(1.234), "1.23");
    }
}
