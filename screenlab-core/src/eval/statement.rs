//! Truth semantics for each statement variant.
//!
//! State-like variants (above/below, between, increasing) must hold at
//! every scanned position, so a zero repeat is vacuously true. Event-like
//! variants (crossed, formed, reached) must fire at some position, so a
//! zero repeat is vacuously false. A missing value at a position makes
//! that position fail, never errors.

use crate::eval::{reindex, value_at, EvalError, SeriesBank};
use crate::lang::{
    Direction, HighLow, IndicatorReference, Margin, MarginKind, StatementIr, ValueOrRef,
};
use crate::domain::Timeframe;
use crate::patterns::{PatternRegistry, PatternSpec};

pub(crate) fn evaluate(
    bank: &mut SeriesBank<'_>,
    patterns: &PatternRegistry,
    ir: &StatementIr,
) -> Result<bool, EvalError> {
    match ir {
        StatementIr::AboveBelow {
            value,
            direction,
            margin,
            other,
            repeat,
        } => {
            for i in 1..=*repeat {
                let lhs = value_at(bank, value, i);
                let rhs = side(bank, other, value.timeframe, i)?;
                let holds = match (lhs, rhs) {
                    (Some(l), Some(r)) => compare(l, r, *direction, margin.as_ref()),
                    _ => false,
                };
                if !holds {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        StatementIr::Between {
            value,
            bound1,
            bound2,
            repeat,
        } => {
            for i in 1..=*repeat {
                let v = value_at(bank, value, i);
                let b1 = side(bank, bound1, value.timeframe, i)?;
                let b2 = side(bank, bound2, value.timeframe, i)?;
                let holds = match (v, b1, b2) {
                    (Some(v), Some(b1), Some(b2)) => {
                        v >= b1.min(b2) && v <= b1.max(b2)
                    }
                    _ => false,
                };
                if !holds {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        StatementIr::Crossed {
            value,
            direction,
            other,
            repeat,
        } => {
            for i in 1..=*repeat {
                let cur = value_at(bank, value, i);
                let prev = value_at(bank, value, i + 1);
                let rhs_cur = side(bank, other, value.timeframe, i)?;
                let rhs_prev = side_previous(bank, other, value.timeframe, i)?;
                let fired = match (cur, prev, rhs_cur, rhs_prev) {
                    (Some(c), Some(p), Some(rc), Some(rp)) => match direction {
                        Direction::Above => c >= rc && p <= rp,
                        Direction::Below => c <= rc && p >= rp,
                    },
                    _ => false,
                };
                if fired {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        StatementIr::GainedDropped {
            value,
            gained,
            margin,
            pair_distance,
        } => {
            // Same band logic as above/below, with the value `distance`
            // bars ago standing in for the comparison level.
            let newer = value_at(bank, value, 1);
            let older = value_at(bank, value, 1 + pair_distance);
            let direction = if *gained {
                Direction::Above
            } else {
                Direction::Below
            };
            Ok(match (newer, older) {
                (Some(n), Some(o)) => compare(n, o, direction, Some(margin)),
                _ => false,
            })
        }
        StatementIr::IncreasingDecreasing {
            value,
            increasing,
            repeat,
        } => {
            for i in 1..=*repeat {
                let cur = value_at(bank, value, i);
                let prev = value_at(bank, value, i + 1);
                let holds = match (cur, prev) {
                    (Some(c), Some(p)) => {
                        // Non-decreasing / non-increasing per step.
                        if *increasing {
                            c >= p
                        } else {
                            c <= p
                        }
                    }
                    _ => false,
                };
                if !holds {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        StatementIr::ReachedHighLow {
            value,
            which,
            window,
            repeat,
        } => {
            for i in 1..=*repeat {
                if reached_extreme(bank, value, *which, *window, i) {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        StatementIr::TopBottom { .. } => Err(EvalError::Internal(
            "ranking statement evaluated as a boolean".to_string(),
        )),
        StatementIr::CandlestickFormed {
            timeframe,
            pattern,
            repeat,
        } => Ok(pattern_formed(bank, patterns, *timeframe, pattern, *repeat)),
    }
}

/// Resolve the right-hand side at repeat index `i`, remapping the index
/// when the other reference lives in a different timeframe.
fn side(
    bank: &mut SeriesBank<'_>,
    v: &ValueOrRef,
    primary: Timeframe,
    i: usize,
) -> Result<Option<f64>, EvalError> {
    match v {
        ValueOrRef::Value(n) => Ok(Some(*n)),
        ValueOrRef::Ref(r) => {
            let j = reindex(i, primary, r.timeframe)?;
            Ok(value_at(bank, r, j))
        }
    }
}

/// The right-hand side one bar before repeat index `i`, in the other
/// reference's own timeframe. Constants are flat, so "previous" is the
/// same value.
fn side_previous(
    bank: &mut SeriesBank<'_>,
    v: &ValueOrRef,
    primary: Timeframe,
    i: usize,
) -> Result<Option<f64>, EvalError> {
    match v {
        ValueOrRef::Value(n) => Ok(Some(*n)),
        ValueOrRef::Ref(r) => {
            let j = reindex(i, primary, r.timeframe)?;
            Ok(value_at(bank, r, j + 1))
        }
    }
}

/// "more than X above" demands the full band beyond the target; "less
/// than X above" demands above but within the band.
fn compare(lhs: f64, rhs: f64, direction: Direction, margin: Option<&Margin>) -> bool {
    let Some(margin) = margin else {
        return match direction {
            Direction::Above => lhs >= rhs,
            Direction::Below => lhs <= rhs,
        };
    };
    // Percent margins are measured against the magnitude of the target
    // side, so "10% above -100" is -90, not -110.
    let extra = match margin.kind {
        MarginKind::Percent => rhs.abs() * margin.amount / 100.0,
        MarginKind::Points => margin.amount,
    };
    let target = match direction {
        Direction::Above => rhs + extra,
        Direction::Below => rhs - extra,
    };
    match (direction, margin.more) {
        (Direction::Above, true) => lhs >= target,
        (Direction::Above, false) => lhs >= rhs && lhs < target,
        (Direction::Below, true) => lhs <= target,
        (Direction::Below, false) => lhs <= rhs && lhs > target,
    }
}

/// True when the value at repeat index `i` matches the extreme of the
/// `window` bars starting at `i` (the bar itself included).
fn reached_extreme(
    bank: &mut SeriesBank<'_>,
    value: &IndicatorReference,
    which: HighLow,
    window: usize,
    i: usize,
) -> bool {
    let Some(v) = value_at(bank, value, i) else {
        return false;
    };
    let mut extreme: Option<f64> = None;
    for j in i..(i + window) {
        let Some(w) = value_at(bank, value, j) else {
            return false;
        };
        extreme = Some(match (extreme, which) {
            (None, _) => w,
            (Some(e), HighLow::High) => e.max(w),
            (Some(e), HighLow::Low) => e.min(w),
        });
    }
    match (extreme, which) {
        (Some(e), HighLow::High) => v >= e,
        (Some(e), HighLow::Low) => v <= e,
        (None, _) => false,
    }
}

/// True when the named pattern (or any pattern of the wildcard's sign,
/// scanned in performance-rank order) fires within the last `repeat` bars.
fn pattern_formed(
    bank: &mut SeriesBank<'_>,
    patterns: &PatternRegistry,
    timeframe: Timeframe,
    name: &str,
    repeat: usize,
) -> bool {
    let Some(table) = bank.history().table(timeframe) else {
        return false;
    };
    let len = table.len();
    if len == 0 {
        return false;
    }
    let fires = |spec: &PatternSpec| {
        let signals = spec.detector.detect(table);
        (1..=repeat.min(len)).any(|i| sign_matches(signals[len - i], spec.expected_sign))
    };
    if let Some(sign) = PatternRegistry::wildcard_sign(name) {
        return patterns.ranked_by_sign(sign).any(fires);
    }
    patterns.lookup(name).is_some_and(fires)
}

fn sign_matches(signal: i32, expected: i8) -> bool {
    match expected {
        s if s > 0 => signal > 0,
        s if s < 0 => signal < 0,
        _ => signal != 0,
    }
}
