//! Bar and OHLCV table — the fundamental market data units.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One OHLCV row for a single symbol at one bar of a timeframe.
///
/// Volume is `f64` because indicator math treats it as just another
/// numeric series (e.g. `volume ma(20)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }
}

/// Plain price/volume columns an indicator reference can name directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
    /// Derived column: high − low.
    Range,
}

impl Column {
    /// Parse a plain field keyword, case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "open" => Some(Column::Open),
            "high" => Some(Column::High),
            "low" => Some(Column::Low),
            "close" => Some(Column::Close),
            "volume" => Some(Column::Volume),
            "range" => Some(Column::Range),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
            Column::Range => "range",
        }
    }
}

/// Column-major OHLCV history for one symbol on one timeframe,
/// rows oldest→newest. The materializer computes full-length indicator
/// series directly over these columns.
#[derive(Debug, Clone, Default)]
pub struct OhlcvTable {
    pub dates: Vec<NaiveDate>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl OhlcvTable {
    pub fn from_bars(bars: &[Bar]) -> Self {
        let mut table = OhlcvTable {
            dates: Vec::with_capacity(bars.len()),
            open: Vec::with_capacity(bars.len()),
            high: Vec::with_capacity(bars.len()),
            low: Vec::with_capacity(bars.len()),
            close: Vec::with_capacity(bars.len()),
            volume: Vec::with_capacity(bars.len()),
        };
        for bar in bars {
            table.dates.push(bar.date);
            table.open.push(bar.open);
            table.high.push(bar.high);
            table.low.push(bar.low);
            table.close.push(bar.close);
            table.volume.push(bar.volume);
        }
        table
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    /// Materialize a plain column as an owned series. `Range` is derived.
    pub fn column(&self, column: Column) -> Vec<f64> {
        match column {
            Column::Open => self.open.clone(),
            Column::High => self.high.clone(),
            Column::Low => self.low.clone(),
            Column::Close => self.close.clone(),
            Column::Volume => self.volume.clone(),
            Column::Range => self
                .high
                .iter()
                .zip(&self.low)
                .map(|(h, l)| h - l)
                .collect(),
        }
    }
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first bar),
/// high = max(open, close) + 1.0, low = min(open, close) − 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_from_bars_preserves_order() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let table = OhlcvTable::from_bars(&bars);
        assert_eq!(table.len(), 3);
        assert_eq!(table.close, vec![10.0, 11.0, 12.0]);
        assert_eq!(table.open[1], 10.0);
    }

    #[test]
    fn range_column_is_high_minus_low() {
        let bars = make_bars(&[10.0, 12.0]);
        let table = OhlcvTable::from_bars(&bars);
        let range = table.column(Column::Range);
        for (i, r) in range.iter().enumerate() {
            assert!((r - (table.high[i] - table.low[i])).abs() < 1e-12);
        }
    }

    #[test]
    fn column_parse_rejects_unknown() {
        assert_eq!(Column::parse("Close"), Some(Column::Close));
        assert_eq!(Column::parse("vwap"), None);
    }
}
