//! Bar-indexed access to materialized series.
//!
//! All access is counted in bars ago: index 1 is the most recent bar,
//! index 2 the one before it. A reference's own offset shifts every
//! access further back; aggregation folds a window of bars strictly
//! older than the shifted position. Any walk off the front of the
//! series, and any
//! NaN produced by indicator warmup, reads as a missing value.

use crate::domain::{PeriodUnit, Timeframe};
use crate::eval::{EvalError, SeriesBank};
use crate::lang::{convert, Aggregation, IndicatorReference};

/// The reference's value `i` bars ago, or `None` when out of range, NaN,
/// or unmaterializable.
pub(crate) fn value_at(
    bank: &mut SeriesBank<'_>,
    reference: &IndicatorReference,
    i: usize,
) -> Option<f64> {
    let series = bank.series(reference.timeframe, &reference.name)?;
    let len = series.len();
    let back = i + reference.offset;
    if back == 0 || back > len {
        return None;
    }
    let idx = len - back;
    match reference.aggregation {
        Aggregation::None => {
            let v = series[idx];
            (!v.is_nan()).then_some(v)
        }
        agg => {
            // The window covers the `agg_range` bars strictly older than
            // the shifted position, which is itself excluded.
            let start = idx.saturating_sub(reference.agg_range);
            let window = series[start..idx].iter().copied().filter(|v| !v.is_nan());
            match agg {
                Aggregation::Min => window.fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.min(v)))
                }),
                Aggregation::Max => window.fold(None, |acc: Option<f64>, v| {
                    Some(acc.map_or(v, |a| a.max(v)))
                }),
                Aggregation::Avg => {
                    let (sum, count) = window.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                    (count > 0).then(|| sum / count as f64)
                }
                Aggregation::None => unreachable!(),
            }
        }
    }
}

/// Remap a repeat index from one timeframe onto another.
///
/// Identity within a timeframe. A finer index maps onto a coarser series
/// by unit conversion, clamped to at least 1 so the remapped access never
/// reaches past the newest bar. A coarser index has no single bar in a
/// finer series; that remap fails.
pub(crate) fn reindex(i: usize, from: Timeframe, to: Timeframe) -> Result<usize, EvalError> {
    if from == to {
        return Ok(i);
    }
    if from > to {
        return Err(EvalError::Reindex { from, to });
    }
    let unit = match from {
        Timeframe::Daily => PeriodUnit::Day,
        Timeframe::Weekly => PeriodUnit::Week,
        Timeframe::Monthly => PeriodUnit::Month,
    };
    Ok(convert(i, unit, to).max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{make_bars, OhlcvTable};
    use crate::eval::SymbolHistory;
    use crate::indicators::IndicatorRegistry;

    fn reference(name: &str, offset: usize, aggregation: Aggregation, agg_range: usize) -> IndicatorReference {
        IndicatorReference {
            timeframe: Timeframe::Daily,
            name: name.to_string(),
            offset,
            aggregation,
            agg_range,
            max_lookback: 1 + offset + agg_range,
        }
    }

    fn history(closes: &[f64]) -> SymbolHistory {
        let mut h = SymbolHistory::new();
        h.insert(Timeframe::Daily, OhlcvTable::from_bars(&make_bars(closes)));
        h
    }

    #[test]
    fn newest_bar_is_index_one() {
        let h = history(&[1.0, 2.0, 3.0]);
        let registry = IndicatorRegistry::builtin();
        let mut bank = SeriesBank::new(&h, &registry);
        let r = reference("close", 0, Aggregation::None, 0);
        assert_eq!(value_at(&mut bank, &r, 1), Some(3.0));
        assert_eq!(value_at(&mut bank, &r, 3), Some(1.0));
        assert_eq!(value_at(&mut bank, &r, 4), None);
    }

    #[test]
    fn offset_shifts_every_access() {
        let h = history(&[1.0, 2.0, 3.0, 4.0]);
        let registry = IndicatorRegistry::builtin();
        let mut bank = SeriesBank::new(&h, &registry);
        let r = reference("close", 2, Aggregation::None, 0);
        assert_eq!(value_at(&mut bank, &r, 1), Some(2.0));
        assert_eq!(value_at(&mut bank, &r, 3), None);
    }

    #[test]
    fn warmup_nan_reads_as_missing() {
        let h = history(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let registry = IndicatorRegistry::builtin();
        let mut bank = SeriesBank::new(&h, &registry);
        let r = reference("ma(3)", 0, Aggregation::None, 0);
        assert_eq!(value_at(&mut bank, &r, 1), Some(4.0));
        // Bars before the window fills are NaN.
        assert_eq!(value_at(&mut bank, &r, 4), None);
    }

    #[test]
    fn aggregate_window_folds_older_values_only() {
        let h = history(&[5.0, 1.0, 9.0, 4.0]);
        let registry = IndicatorRegistry::builtin();
        let mut bank = SeriesBank::new(&h, &registry);
        // At i=1 the window covers [5, 1, 9]; the newest bar (4) is out.
        let max3 = reference("close", 0, Aggregation::Max, 3);
        assert_eq!(value_at(&mut bank, &max3, 1), Some(9.0));
        let min3 = reference("close", 0, Aggregation::Min, 3);
        assert_eq!(value_at(&mut bank, &min3, 1), Some(1.0));
        let avg2 = reference("close", 0, Aggregation::Avg, 2);
        assert_eq!(value_at(&mut bank, &avg2, 1), Some(5.0));
    }

    #[test]
    fn aggregate_window_skips_nan() {
        let h = history(&[1.0, 2.0, 3.0, 4.0]);
        let registry = IndicatorRegistry::builtin();
        let mut bank = SeriesBank::new(&h, &registry);
        // ma(3) over 4 bars: [NaN, NaN, 2, 3]; the 3-wide window older
        // than i=1 is [NaN, NaN, 2].
        let r = reference("ma(3)", 0, Aggregation::Max, 3);
        assert_eq!(value_at(&mut bank, &r, 1), Some(2.0));
    }

    #[test]
    fn reindex_identity_and_finer_to_coarser() {
        assert_eq!(reindex(3, Timeframe::Daily, Timeframe::Daily).unwrap(), 3);
        assert_eq!(reindex(10, Timeframe::Daily, Timeframe::Weekly).unwrap(), 2);
        // Clamped so the remapped access stays on the series.
        assert_eq!(reindex(2, Timeframe::Daily, Timeframe::Weekly).unwrap(), 1);
        assert_eq!(reindex(2, Timeframe::Weekly, Timeframe::Monthly).unwrap(), 1);
    }

    #[test]
    fn reindex_coarser_to_finer_fails() {
        assert!(matches!(
            reindex(2, Timeframe::Weekly, Timeframe::Daily),
            Err(EvalError::Reindex { .. })
        ));
        assert!(matches!(
            reindex(1, Timeframe::Monthly, Timeframe::Weekly),
            Err(EvalError::Reindex { .. })
        ));
    }
}
