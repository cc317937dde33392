//! History providers: where per-symbol OHLCV tables come from.

use chrono::NaiveDate;
use screenlab_core::domain::{Bar, OhlcvTable, Timeframe};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Cooperative cancellation for a running screen. Cloned into the code
/// that can cancel; the scheduler checks it at the fetch boundary, so a
/// stuck fetch stalls one task only and everything after it stops.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("no {timeframe} history for '{symbol}'")]
    Missing { symbol: String, timeframe: Timeframe },

    #[error("malformed {timeframe} history for '{symbol}': {reason}")]
    Malformed {
        symbol: String,
        timeframe: Timeframe,
        reason: String,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of per-symbol history. Implementations must be shareable across
/// the worker pool.
///
/// `min_bars` is a sizing hint: the provider returns at least that many of
/// the newest bars when it has them, and everything it has otherwise. The
/// scheduler decides what to do with a short return.
pub trait HistoryProvider: Send + Sync {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<OhlcvTable, DataError>;
}

/// Row shape of an on-disk history file.
#[derive(Debug, Deserialize)]
struct CsvBar {
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

/// Reads `<root>/<timeframe>/<SYMBOL>.csv`, oldest or newest first; rows
/// are re-sorted by date and void rows dropped before tabling.
#[derive(Debug, Clone)]
pub struct CsvHistoryProvider {
    root: PathBuf,
}

impl CsvHistoryProvider {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, symbol: &str, timeframe: Timeframe) -> PathBuf {
        self.root
            .join(timeframe.as_str())
            .join(format!("{}.csv", symbol.to_ascii_uppercase()))
    }
}

impl HistoryProvider for CsvHistoryProvider {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<OhlcvTable, DataError> {
        let path = self.path_for(symbol, timeframe);
        if !path.exists() {
            return Err(DataError::Missing {
                symbol: symbol.to_string(),
                timeframe,
            });
        }
        let mut reader = csv::Reader::from_path(&path).map_err(|e| DataError::Malformed {
            symbol: symbol.to_string(),
            timeframe,
            reason: e.to_string(),
        })?;
        let mut bars = Vec::new();
        for row in reader.deserialize::<CsvBar>() {
            let row = row.map_err(|e| DataError::Malformed {
                symbol: symbol.to_string(),
                timeframe,
                reason: e.to_string(),
            })?;
            let bar = Bar {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            };
            if !bar.is_void() {
                bars.push(bar);
            }
        }
        bars.sort_by_key(|b| b.date);
        if bars.len() > min_bars {
            bars.drain(..bars.len() - min_bars);
        }
        Ok(OhlcvTable::from_bars(&bars))
    }
}

/// In-memory provider for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticHistoryProvider {
    tables: HashMap<(String, Timeframe), Vec<Bar>>,
}

impl StaticHistoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        self.tables.insert((symbol.to_string(), timeframe), bars);
    }
}

impl HistoryProvider for StaticHistoryProvider {
    fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        min_bars: usize,
    ) -> Result<OhlcvTable, DataError> {
        let bars = self
            .tables
            .get(&(symbol.to_string(), timeframe))
            .ok_or_else(|| DataError::Missing {
                symbol: symbol.to_string(),
                timeframe,
            })?;
        let keep = if bars.len() > min_bars {
            &bars[bars.len() - min_bars..]
        } else {
            &bars[..]
        };
        Ok(OhlcvTable::from_bars(keep))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, timeframe: Timeframe, symbol: &str, rows: &[(&str, f64)]) {
        let tf_dir = dir.join(timeframe.as_str());
        std::fs::create_dir_all(&tf_dir).unwrap();
        let mut file = std::fs::File::create(tf_dir.join(format!("{symbol}.csv"))).unwrap();
        writeln!(file, "date,open,high,low,close,volume").unwrap();
        for (date, close) in rows {
            writeln!(
                file,
                "{date},{close},{:.1},{:.1},{close},1000",
                close + 1.0,
                close - 1.0
            )
            .unwrap();
        }
    }

    #[test]
    fn reads_sorts_and_truncates() {
        let dir = tempfile::tempdir().unwrap();
        // Newest first on disk; provider re-sorts.
        write_csv(
            dir.path(),
            Timeframe::Daily,
            "ACME",
            &[("2024-01-04", 4.0), ("2024-01-02", 2.0), ("2024-01-03", 3.0)],
        );
        let provider = CsvHistoryProvider::new(dir.path());
        let table = provider.fetch("acme", Timeframe::Daily, 2).unwrap();
        assert_eq!(table.len(), 2);
        let closes = table.column(screenlab_core::domain::Column::Close);
        assert_eq!(closes, vec![3.0, 4.0]);
    }

    #[test]
    fn missing_file_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvHistoryProvider::new(dir.path());
        assert!(matches!(
            provider.fetch("GONE", Timeframe::Weekly, 10),
            Err(DataError::Missing { .. })
        ));
    }
}
