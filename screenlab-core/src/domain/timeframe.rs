//! Timeframes and duration units.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation level of price history. Every indicator reference and
/// candlestick statement is pinned to exactly one timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    /// Parse a timeframe keyword ("daily", "weekly", "monthly"), case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "daily" => Some(Timeframe::Daily),
            "weekly" => Some(Timeframe::Weekly),
            "monthly" => Some(Timeframe::Monthly),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit of a duration phrase ("5 days", "2 weeks", "1 month").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
}

impl PeriodUnit {
    /// Parse a period keyword, singular or plural, case-insensitive.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Some(PeriodUnit::Day),
            "week" | "weeks" => Some(PeriodUnit::Week),
            "month" | "months" => Some(PeriodUnit::Month),
            _ => None,
        }
    }

    /// The timeframe whose bars this unit counts directly.
    pub fn native_timeframe(&self) -> Timeframe {
        match self {
            PeriodUnit::Day => Timeframe::Daily,
            PeriodUnit::Week => Timeframe::Weekly,
            PeriodUnit::Month => Timeframe::Monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeframe_parse_is_case_insensitive() {
        assert_eq!(Timeframe::parse("Weekly"), Some(Timeframe::Weekly));
        assert_eq!(Timeframe::parse(" MONTHLY "), Some(Timeframe::Monthly));
        assert_eq!(Timeframe::parse("hourly"), None);
    }

    #[test]
    fn period_unit_accepts_singular_and_plural() {
        assert_eq!(PeriodUnit::parse("day"), Some(PeriodUnit::Day));
        assert_eq!(PeriodUnit::parse("Days"), Some(PeriodUnit::Day));
        assert_eq!(PeriodUnit::parse("weeks"), Some(PeriodUnit::Week));
        assert_eq!(PeriodUnit::parse("month"), Some(PeriodUnit::Month));
        assert_eq!(PeriodUnit::parse("years"), None);
    }

    #[test]
    fn timeframe_serializes_lowercase() {
        let json = serde_json::to_string(&Timeframe::Weekly).unwrap();
        assert_eq!(json, "\"weekly\"");
        let back: Timeframe = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Timeframe::Weekly);
    }
}
