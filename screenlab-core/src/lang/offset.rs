//! Duration → bar-count conversion.
//!
//! A duration phrase ("2 weeks") is meaningless on its own: it has to be
//! converted into a bar count for the timeframe of the indicator it
//! modifies. Finer→coarser conversions truncate toward zero, so e.g.
//! "2 weeks" on a monthly indicator is 0 bars.

use crate::domain::{PeriodUnit, Timeframe};

/// Bars that trade within one coarser bar: 5 days/week, 20 days/month,
/// 4 weeks/month.
const DAYS_PER_WEEK: usize = 5;
const DAYS_PER_MONTH: usize = 20;
const WEEKS_PER_MONTH: usize = 4;

/// Convert `n` units into a bar count on `target`.
pub fn convert(n: usize, unit: PeriodUnit, target: Timeframe) -> usize {
    match (target, unit) {
        (Timeframe::Daily, PeriodUnit::Day) => n,
        (Timeframe::Daily, PeriodUnit::Week) => n * DAYS_PER_WEEK,
        (Timeframe::Daily, PeriodUnit::Month) => n * DAYS_PER_MONTH,
        (Timeframe::Weekly, PeriodUnit::Day) => n / DAYS_PER_WEEK,
        (Timeframe::Weekly, PeriodUnit::Week) => n,
        (Timeframe::Weekly, PeriodUnit::Month) => n * WEEKS_PER_MONTH,
        (Timeframe::Monthly, PeriodUnit::Day) => n / DAYS_PER_MONTH,
        (Timeframe::Monthly, PeriodUnit::Week) => n / WEEKS_PER_MONTH,
        (Timeframe::Monthly, PeriodUnit::Month) => n,
    }
}

/// Parse a duration phrase like "5 days" or "1 month" into (count, unit).
/// Returns `None` when the text is not of that shape.
pub fn parse_duration(text: &str) -> Option<(usize, PeriodUnit)> {
    let mut parts = text.split_whitespace();
    let n: usize = parts.next()?.parse().ok()?;
    let unit = PeriodUnit::parse(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some((n, unit))
}

/// Parse and convert in one step: "5 days" on a weekly indicator → 1 bar.
pub fn duration_bars(text: &str, target: Timeframe) -> Option<usize> {
    let (n, unit) = parse_duration(text)?;
    Some(convert(n, unit, target))
}
