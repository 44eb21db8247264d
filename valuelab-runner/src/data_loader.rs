//! Input loading for the runner.
//!
//! Reads the price table (CSV or Parquet), the signal table (CSV or Parquet)
//! and the optional market index (CSV), then builds the read-only views the
//! engine consumes. Loading policy:
//! 1. Prices and signals are required; any read error is fatal
//! 2. The index is optional; a missing or unreadable file degrades the
//!    regime filter to always bullish with a warning
//! 3. Rows with a non-finite value are dropped as gaps

use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use thiserror::Error;
use tracing::{info, warn};
use valuelab_core::data::{
    IndexRow, IndexSeries, MarketDataView, PriceRow, SignalRow, SignalView, ViewError,
};

use crate::config::InputsConfig;

/// Column names accepted for the signal probability, in preference order.
const PROBABILITY_COLUMNS: [&str; 2] = ["prediction_proba", "probability"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Parquet error in {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("{path}: missing column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("{path}: row {row}: {message}")]
    Parse {
        path: PathBuf,
        row: usize,
        message: String,
    },

    #[error("{path}: unsupported file type (expected .csv or .parquet)")]
    UnsupportedFormat { path: PathBuf },

    #[error("input views: {0}")]
    View(#[from] ViewError),
}

/// Views ready for simulation, with provenance.
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub market: MarketDataView,
    pub signals: SignalView,
    /// BLAKE3 over all loaded rows in sorted order.
    pub dataset_hash: String,
    pub has_index: bool,
    pub has_synthetic: bool,
}

/// Load every input named in `inputs` and build the views.
pub fn load_inputs(inputs: &InputsConfig) -> Result<LoadedInputs, LoadError> {
    let prices = read_price_rows(&inputs.prices)?;
    let signals = read_signal_rows(&inputs.signals)?;
    let index_rows = match &inputs.index {
        Some(path) => match read_index_rows(path) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "index series unavailable; regime filter disabled");
                Vec::new()
            }
        },
        None => {
            warn!("no index series configured; regime filter disabled");
            Vec::new()
        }
    };
    if inputs.synthetic {
        warn!("inputs are synthetic; results will be tagged");
    }

    info!(
        price_rows = prices.len(),
        signal_rows = signals.len(),
        index_rows = index_rows.len(),
        "inputs loaded"
    );
    build_inputs(prices, signals, index_rows, inputs.synthetic)
}

/// Build views and the dataset hash from already-read rows.
pub fn build_inputs(
    prices: Vec<PriceRow>,
    signals: Vec<SignalRow>,
    index_rows: Vec<IndexRow>,
    has_synthetic: bool,
) -> Result<LoadedInputs, LoadError> {
    let dataset_hash = compute_dataset_hash(&prices, &signals, &index_rows);
    let index = IndexSeries::from_rows(index_rows);
    let has_index = !index.is_empty();
    let market = MarketDataView::from_rows(&prices, Some(index))?;
    let signals = SignalView::from_rows(&signals)?;

    Ok(LoadedInputs {
        market,
        signals,
        dataset_hash,
        has_index,
        has_synthetic,
    })
}

// ─── Readers ────────────────────────────────────────────────────────

enum Format {
    Csv,
    Parquet,
}

fn format_of(path: &Path) -> Result<Format, LoadError> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => Ok(Format::Csv),
        Some("parquet" | "pq") => Ok(Format::Parquet),
        _ => Err(LoadError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read `date, ticker, close` rows. Extra columns are ignored.
pub fn read_price_rows(path: &Path) -> Result<Vec<PriceRow>, LoadError> {
    let rows = match format_of(path)? {
        Format::Csv => read_panel_csv(path, &["close"])?,
        Format::Parquet => read_panel_parquet(path, &["close"])?,
    };
    Ok(rows
        .into_iter()
        .filter(|(_, _, close)| close.is_finite())
        .map(|(date, ticker, close)| PriceRow { date, ticker, close })
        .collect())
}

/// Read `date, ticker, prediction_proba` rows (`probability` also accepted).
pub fn read_signal_rows(path: &Path) -> Result<Vec<SignalRow>, LoadError> {
    let rows = match format_of(path)? {
        Format::Csv => read_panel_csv(path, &PROBABILITY_COLUMNS)?,
        Format::Parquet => read_panel_parquet(path, &PROBABILITY_COLUMNS)?,
    };
    Ok(rows
        .into_iter()
        .filter(|(_, _, p)| p.is_finite())
        .map(|(date, ticker, probability)| SignalRow {
            date,
            ticker,
            probability,
        })
        .collect())
}

/// Read `date, close` rows for the market index.
pub fn read_index_rows(path: &Path) -> Result<Vec<IndexRow>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|e| csv_err(path, e))?.clone();
    let date_col = find_column(path, &headers, &["date"])?;
    let close_col = find_column(path, &headers, &["close"])?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_err(path, e))?;
        let date = parse_date(path, i + 1, record.get(date_col).unwrap_or(""))?;
        let close = parse_value(path, i + 1, record.get(close_col).unwrap_or(""))?;
        if close.is_finite() {
            rows.push(IndexRow { date, close });
        }
    }
    Ok(rows)
}

fn open_csv(path: &Path) -> Result<csv::Reader<File>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file))
}

fn csv_err(path: &Path, source: csv::Error) -> LoadError {
    LoadError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

fn find_column(
    path: &Path,
    headers: &csv::StringRecord,
    names: &[&str],
) -> Result<usize, LoadError> {
    names
        .iter()
        .find_map(|name| headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: names.join("|"),
        })
}

/// Accepts `YYYY-MM-DD` with an optional time suffix.
fn parse_date(path: &Path, row: usize, raw: &str) -> Result<NaiveDate, LoadError> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        row,
        message: format!("bad date '{raw}': {e}"),
    })
}

/// Empty cells and `NaN` read as NaN (a gap).
fn parse_value(path: &Path, row: usize, raw: &str) -> Result<f64, LoadError> {
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>().map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        row,
        message: format!("bad number '{raw}': {e}"),
    })
}

fn read_panel_csv(
    path: &Path,
    value_columns: &[&str],
) -> Result<Vec<(NaiveDate, String, f64)>, LoadError> {
    let mut reader = open_csv(path)?;
    let headers = reader.headers().map_err(|e| csv_err(path, e))?.clone();
    let date_col = find_column(path, &headers, &["date"])?;
    let ticker_col = find_column(path, &headers, &["ticker"])?;
    let value_col = find_column(path, &headers, value_columns)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| csv_err(path, e))?;
        let date = parse_date(path, i + 1, record.get(date_col).unwrap_or(""))?;
        let ticker = record.get(ticker_col).unwrap_or("").to_string();
        if ticker.is_empty() {
            return Err(LoadError::Parse {
                path: path.to_path_buf(),
                row: i + 1,
                message: "empty ticker".into(),
            });
        }
        let value = parse_value(path, i + 1, record.get(value_col).unwrap_or(""))?;
        rows.push((date, ticker, value));
    }
    Ok(rows)
}

fn read_panel_parquet(
    path: &Path,
    value_columns: &[&str],
) -> Result<Vec<(NaiveDate, String, f64)>, LoadError> {
    let pq_err = |source: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = ParquetReader::new(file).finish().map_err(pq_err)?;

    let missing = |column: &str| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: column.to_string(),
    };
    let value_name = value_columns
        .iter()
        .find(|c| df.column(c).is_ok())
        .ok_or_else(|| missing(&value_columns.join("|")))?;

    let dates = parquet_dates(path, &df)?;
    let tickers = df.column("ticker").map_err(|_| missing("ticker"))?;
    let tickers = tickers.str().map_err(pq_err)?;
    let values = df
        .column(value_name)
        .map_err(pq_err)?
        .cast(&DataType::Float64)
        .map_err(pq_err)?;
    let values = values.f64().map_err(pq_err)?;

    let mut rows = Vec::with_capacity(df.height());
    for (i, date) in dates.into_iter().enumerate() {
        let ticker = tickers.get(i).ok_or_else(|| LoadError::Parse {
            path: path.to_path_buf(),
            row: i + 1,
            message: "null ticker".into(),
        })?;
        rows.push((date, ticker.to_string(), values.get(i).unwrap_or(f64::NAN)));
    }
    Ok(rows)
}

/// The `date` column as a Date (epoch days) or `YYYY-MM-DD` strings.
fn parquet_dates(path: &Path, df: &DataFrame) -> Result<Vec<NaiveDate>, LoadError> {
    let pq_err = |source: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let column = df.column("date").map_err(|_| LoadError::MissingColumn {
        path: path.to_path_buf(),
        column: "date".into(),
    })?;
    let null_date = |row: usize| LoadError::Parse {
        path: path.to_path_buf(),
        row,
        message: "null date".into(),
    };

    match column.dtype() {
        DataType::String => {
            let ca = column.str().map_err(pq_err)?;
            (0..df.height())
                .map(|i| {
                    let raw = ca.get(i).ok_or_else(|| null_date(i + 1))?;
                    parse_date(path, i + 1, raw)
                })
                .collect()
        }
        _ => {
            let column = column.cast(&DataType::Date).map_err(pq_err)?;
            let ca = column.date().map_err(pq_err)?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
            (0..df.height())
                .map(|i| {
                    let days = ca.get(i).ok_or_else(|| null_date(i + 1))?;
                    Ok(epoch + chrono::Duration::days(days as i64))
                })
                .collect()
        }
    }
}

// ─── Writers ────────────────────────────────────────────────────────

/// Write rows as CSV with a header derived from the row type.
pub fn write_rows_csv<T: serde::Serialize>(path: &Path, rows: &[T]) -> Result<(), LoadError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| csv_err(path, e))?;
    }
    writer.flush().map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write price rows to Parquet with a Date-typed `date` column.
pub fn write_prices_parquet(path: &Path, rows: &[PriceRow]) -> Result<(), LoadError> {
    let pq_err = |source: PolarsError| LoadError::Parquet {
        path: path.to_path_buf(),
        source,
    };
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    let days: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();

    let mut df = DataFrame::new(vec![
        Column::new("date".into(), days)
            .cast(&DataType::Date)
            .map_err(pq_err)?,
        Column::new("ticker".into(), tickers),
        Column::new("close".into(), closes),
    ])
    .map_err(pq_err)?;

    let file = File::create(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ParquetWriter::new(file).finish(&mut df).map_err(pq_err)?;
    Ok(())
}

// ─── Hashing ────────────────────────────────────────────────────────

/// Deterministic BLAKE3 hash over all rows, independent of input order.
pub fn compute_dataset_hash(
    prices: &[PriceRow],
    signals: &[SignalRow],
    index: &[IndexRow],
) -> String {
    let mut hasher = blake3::Hasher::new();

    let mut prices: Vec<&PriceRow> = prices.iter().collect();
    prices.sort_by(|a, b| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)));
    hasher.update(b"prices");
    for row in prices {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(row.ticker.as_bytes());
        hasher.update(&row.close.to_le_bytes());
    }

    let mut signals: Vec<&SignalRow> = signals.iter().collect();
    signals.sort_by(|a, b| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)));
    hasher.update(b"signals");
    for row in signals {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(row.ticker.as_bytes());
        hasher.update(&row.probability.to_le_bytes());
    }

    let mut index: Vec<&IndexRow> = index.iter().collect();
    index.sort_by_key(|r| r.date);
    hasher.update(b"index");
    for row in index {
        hasher.update(row.date.to_string().as_bytes());
        hasher.update(&row.close.to_le_bytes());
    }

    hasher.finalize().to_hex().to_string()
}
