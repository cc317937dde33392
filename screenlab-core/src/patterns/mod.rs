//! Candlestick pattern registry.
//!
//! Maps pattern names the rule language accepts to a detector, the signal
//! sign a match is expected to carry, and a performance rank. Wildcard
//! names ("bullish candlestick pattern", …) are registered for grammar
//! matching but resolved at evaluation time by scanning concrete patterns
//! in rank order.

pub mod detect;

use crate::domain::OhlcvTable;

/// Wildcard pattern names: any registered pattern of the matching sign.
pub const BULLISH_WILDCARD: &str = "bullish candlestick pattern";
pub const BEARISH_WILDCARD: &str = "bearish candlestick pattern";
pub const NEUTRAL_WILDCARD: &str = "neutral candlestick pattern";

/// Detector dispatch id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detector {
    Doji,
    Hammer,
    HangingMan,
    Engulfing,
    Harami,
    PiercingLine,
    DarkCloudCover,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl Detector {
    pub fn detect(&self, table: &OhlcvTable) -> Vec<i32> {
        match self {
            Detector::Doji => detect::doji(table),
            Detector::Hammer => detect::hammer(table),
            Detector::HangingMan => detect::hanging_man(table),
            Detector::Engulfing => detect::engulfing(table),
            Detector::Harami => detect::harami(table),
            Detector::PiercingLine => detect::piercing_line(table),
            Detector::DarkCloudCover => detect::dark_cloud_cover(table),
            Detector::MorningStar => detect::morning_star(table),
            Detector::EveningStar => detect::evening_star(table),
            Detector::ThreeWhiteSoldiers => detect::three_white_soldiers(table),
            Detector::ThreeBlackCrows => detect::three_black_crows(table),
        }
    }
}

/// One registered pattern: expected sign is +1 bullish, −1 bearish,
/// 0 neutral (any non-zero signal counts). Lower rank = better historical
/// performance; wildcard resolution scans in rank order.
#[derive(Debug, Clone)]
pub struct PatternSpec {
    pub name: &'static str,
    pub detector: Detector,
    pub expected_sign: i8,
    pub performance_rank: u32,
}

#[derive(Debug, Clone)]
pub struct PatternRegistry {
    specs: Vec<PatternSpec>,
}

impl PatternRegistry {
    pub fn builtin() -> Self {
        use Detector::*;
        let mut specs = vec![
            pattern("three white soldiers", ThreeWhiteSoldiers, 1, 1),
            pattern("morning star", MorningStar, 1, 2),
            pattern("three black crows", ThreeBlackCrows, -1, 3),
            pattern("evening star", EveningStar, -1, 4),
            pattern("bullish engulfing", Engulfing, 1, 5),
            pattern("bearish engulfing", Engulfing, -1, 6),
            pattern("piercing line", PiercingLine, 1, 7),
            pattern("dark cloud cover", DarkCloudCover, -1, 8),
            pattern("bullish harami", Harami, 1, 9),
            pattern("bearish harami", Harami, -1, 10),
            pattern("hammer", Hammer, 1, 11),
            pattern("hanging man", HangingMan, -1, 12),
            pattern("doji", Doji, 0, 13),
        ];
        specs.sort_by_key(|p| p.performance_rank);
        Self { specs }
    }

    /// Look up a concrete pattern by canonical (lowercase,
    /// whitespace-collapsed) name.
    pub fn lookup(&self, name: &str) -> Option<&PatternSpec> {
        self.specs.iter().find(|p| p.name == name)
    }

    /// True for a concrete or wildcard name this registry can evaluate.
    pub fn recognizes(&self, name: &str) -> bool {
        self.lookup(name).is_some() || Self::wildcard_sign(name).is_some()
    }

    /// Expected sign of a wildcard name, if `name` is one.
    pub fn wildcard_sign(name: &str) -> Option<i8> {
        match name {
            BULLISH_WILDCARD => Some(1),
            BEARISH_WILDCARD => Some(-1),
            NEUTRAL_WILDCARD => Some(0),
            _ => None,
        }
    }

    /// Concrete patterns of the given sign, in performance-rank order.
    pub fn ranked_by_sign(&self, sign: i8) -> impl Iterator<Item = &PatternSpec> {
        self.specs.iter().filter(move |p| p.expected_sign == sign)
    }

    /// Regex fragment matching any pattern name (wildcards included),
    /// longest-name-first.
    pub fn name_pattern(&self) -> String {
        let mut names: Vec<&str> = self
            .specs
            .iter()
            .map(|p| p.name)
            .chain([BULLISH_WILDCARD, BEARISH_WILDCARD, NEUTRAL_WILDCARD])
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        names
            .iter()
            .map(|n| regex::escape(n).replace(' ', r"\s+"))
            .collect::<Vec<_>>()
            .join("|")
    }
}

fn pattern(
    name: &'static str,
    detector: Detector,
    expected_sign: i8,
    performance_rank: u32,
) -> PatternSpec {
    PatternSpec {
        name,
        detector,
        expected_sign,
        performance_rank,
    }
}
