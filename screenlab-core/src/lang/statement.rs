//! Statement translation: free text → typed IR.
//!
//! Eight grammars are tried in fixed priority order; the first match wins.
//! Each grammar embeds the indicator-phrase fragment built from the
//! registry (longest-name-first), so an unknown function name simply fails
//! to match. The trailing-capture guard replicates a deliberately sharp
//! edge: a captured trailing value/indicator is accepted only when a
//! duration clause was captured too, or the capture is the literal
//! trailing suffix of the right-trimmed statement. Without it, a duration
//! clause could be partially absorbed into the comparison value.

use crate::domain::Timeframe;
use crate::indicators::IndicatorRegistry;
use crate::lang::reference::{phrase_fragment, IndicatorReference, ReferenceResolver, PERIOD};
use crate::lang::{offset, TranslateError};
use crate::patterns::PatternRegistry;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginKind {
    Percent,
    Points,
}

/// A "more/less than X % / points" qualifier.
///
/// "more than" pushes the comparison level out to the far edge of the
/// band; "less than" narrows it into a half-open near-band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub more: bool,
    pub amount: f64,
    pub kind: MarginKind,
}

/// Right-hand side of a comparison: a literal number or another reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueOrRef {
    Value(f64),
    Ref(IndicatorReference),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HighLow {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankDirection {
    Top,
    Bottom,
}

/// What a top/bottom ranking orders by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBasis {
    /// Precomputed per-symbol scalar from the catalog; no history fetch.
    IbdRelativeStrength,
    Indicator(IndicatorReference),
}

/// Typed intermediate representation of one statement. Immutable.
///
/// `repeat` counts bars-ago positions the evaluator scans (AND for
/// state-like variants, OR for event-like ones); duration folding differs
/// per variant and is performed here at translation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatementIr {
    AboveBelow {
        value: IndicatorReference,
        direction: Direction,
        margin: Option<Margin>,
        other: ValueOrRef,
        repeat: usize,
    },
    Between {
        value: IndicatorReference,
        bound1: ValueOrRef,
        bound2: ValueOrRef,
        repeat: usize,
    },
    Crossed {
        value: IndicatorReference,
        direction: Direction,
        other: ValueOrRef,
        repeat: usize,
    },
    GainedDropped {
        value: IndicatorReference,
        gained: bool,
        margin: Margin,
        /// Bars between the two compared values.
        pair_distance: usize,
    },
    IncreasingDecreasing {
        value: IndicatorReference,
        increasing: bool,
        repeat: usize,
    },
    ReachedHighLow {
        value: IndicatorReference,
        which: HighLow,
        /// Trailing-window length in bars of the reference timeframe.
        window: usize,
        repeat: usize,
    },
    TopBottom {
        direction: RankDirection,
        count: usize,
        basis: RankBasis,
    },
    CandlestickFormed {
        timeframe: Timeframe,
        pattern: String,
        repeat: usize,
    },
}

impl StatementIr {
    /// Every indicator reference this statement reads.
    pub fn references(&self) -> Vec<&IndicatorReference> {
        fn push<'a>(out: &mut Vec<&'a IndicatorReference>, v: &'a ValueOrRef) {
            if let ValueOrRef::Ref(r) = v {
                out.push(r);
            }
        }
        let mut out = Vec::new();
        match self {
            StatementIr::AboveBelow { value, other, .. }
            | StatementIr::Crossed { value, other, .. } => {
                out.push(value);
                push(&mut out, other);
            }
            StatementIr::Between {
                value,
                bound1,
                bound2,
                ..
            } => {
                out.push(value);
                push(&mut out, bound1);
                push(&mut out, bound2);
            }
            StatementIr::GainedDropped { value, .. }
            | StatementIr::IncreasingDecreasing { value, .. }
            | StatementIr::ReachedHighLow { value, .. } => out.push(value),
            StatementIr::TopBottom { basis, .. } => {
                if let RankBasis::Indicator(r) = basis {
                    out.push(r);
                }
            }
            StatementIr::CandlestickFormed { .. } => {}
        }
        out
    }
}

/// Compiled statement grammars. Build once (registries in hand), reuse for
/// every statement of every rule.
#[derive(Debug)]
pub struct Translator {
    resolver: ReferenceResolver,
    above_below: Regex,
    between: Regex,
    crossed: Regex,
    gained_dropped: Regex,
    increasing_decreasing: Regex,
    reached_high_low: Regex,
    top_bottom: Regex,
    formed: Regex,
    number: Regex,
}

impl Translator {
    pub fn new(indicators: &IndicatorRegistry, patterns: &PatternRegistry) -> Self {
        let ind = phrase_fragment(indicators);
        let more_less = r"(?:more|less)\s+than\s+\d+\.?\d*(?:%|\s+points|\s+point)";
        let duration = format!(r"[1-9]\d*\s+{PERIOD}");
        let grammar = |pattern: &str| {
            Regex::new(&format!("(?i){pattern}")).expect("statement grammar must compile")
        };

        let above_below = grammar(&format!(
            r"(?P<indicator>{ind})\s+(?:is|was|has\s+been|had\s+been)\s+(?:(?P<more_less>{more_less})\s+)?(?P<above_below>above|below)\s+(?:(?P<other_ind>{ind})|(?P<other_val>-?\d+\.?\d*))(?:\s+for\s+the\s+last\s+(?P<duration>{duration}))?"
        ));
        let between = grammar(&format!(
            r"(?P<indicator>{ind})\s+(?:is|was|has\s+been|had\s+been)\s+from\s+(?:(?P<b1_ind>{ind})|(?P<b1_val>-?\d+\.?\d*))\s+to\s+(?:(?P<b2_ind>{ind})|(?P<b2_val>-?\d+\.?\d*))(?:\s+for\s+the\s+last\s+(?P<duration>{duration}))?"
        ));
        let crossed = grammar(&format!(
            r"(?P<indicator>{ind})\s+(?:crossed|has\s+crossed)\s+(?P<above_below>above|below)\s+(?:(?P<other_ind>{ind})|(?P<other_val>-?\d+\.?\d*))(?:\s+within\s+the\s+last\s+(?P<duration>{duration}))?"
        ));
        let gained_dropped = grammar(&format!(
            r"(?P<indicator>{ind})\s+(?P<verb>dropped|gained)\s+(?P<more_less>{more_less})(?:\s+over\s+the\s+last\s+(?P<duration>{duration}))?"
        ));
        let increasing_decreasing = grammar(&format!(
            r"(?P<indicator>{ind})\s+has\s+been\s+(?P<verb>increasing|decreasing)\s+for\s+(?P<duration>{duration})"
        ));
        let reached_high_low = grammar(&format!(
            r"(?P<indicator>{ind})\s+(?:reached|has\s+reached)\s+a\s+new\s+(?P<high_low>[1-9]\d*\s+{PERIOD}\s+(?:high|low))(?:\s+within\s+the\s+last\s+(?P<duration>{duration}))?"
        ));
        let top_bottom = grammar(&format!(
            r"(?P<top_bottom>top|bottom)\s+(?P<number>[1-9]\d*)\s+(?:(?P<indicator>{ind})|IBD\s+Relative\s+Strength)"
        ));
        let formed = grammar(&format!(
            r"(?:(?P<timeframe>daily|weekly|monthly)\s+)?(?P<cspattern>{})\s+(?:formed|has\s+formed)(?:\s+within\s+the\s+last\s+(?P<duration>{duration}))?",
            patterns.name_pattern()
        ));

        Self {
            resolver: ReferenceResolver::new(indicators),
            above_below,
            between,
            crossed,
            gained_dropped,
            increasing_decreasing,
            reached_high_low,
            top_bottom,
            formed,
            number: Regex::new(r"\d+\.?\d*").expect("number pattern must compile"),
        }
    }

    pub fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Translate one statement. Grammars are tried in priority order; a
    /// grammar whose trailing-capture guard fails falls through to the
    /// next one, and exhausting all of them is an
    /// [`TranslateError::UnrecognizedStatement`].
    pub fn translate(&self, statement: &str) -> Result<StatementIr, TranslateError> {
        if let Some(ir) = self.try_above_below(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_between(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_crossed(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_gained_dropped(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_increasing_decreasing(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_reached_high_low(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_top_bottom(statement)? {
            return Ok(ir);
        }
        if let Some(ir) = self.try_formed(statement)? {
            return Ok(ir);
        }
        Err(TranslateError::UnrecognizedStatement(statement.to_string()))
    }

    /// The trailing-capture guard: duration captured, or the capture is
    /// the literal trailing suffix of the right-trimmed statement.
    fn trailing_ok(statement: &str, capture: &str, has_duration: bool) -> bool {
        has_duration || statement.trim_end().ends_with(capture)
    }

    /// Fold a duration clause into the primary reference and return the
    /// repeat count. The reference's history requirement grows by the
    /// duration; the access offset does not.
    fn fold_duration(&self, duration: Option<&str>, value: &mut IndicatorReference) -> Option<usize> {
        let text = duration?;
        let bars = offset::duration_bars(text, value.timeframe)?;
        value.max_lookback += bars;
        bars.into()
    }

    /// Fold the same duration clause into a secondary reference, re-converting
    /// when its timeframe differs from the primary's.
    fn fold_duration_other(
        duration_text: &str,
        primary_bars: usize,
        primary_tf: Timeframe,
        other: &mut IndicatorReference,
    ) {
        if other.timeframe == primary_tf {
            other.max_lookback += primary_bars;
        } else if let Some(bars) = offset::duration_bars(duration_text, other.timeframe) {
            other.max_lookback += bars;
        }
    }

    fn parse_margin(&self, text: &str) -> Result<Margin, TranslateError> {
        let amount = self
            .number
            .find(text)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| TranslateError::UnrecognizedStatement(text.to_string()))?;
        Ok(Margin {
            more: text.to_ascii_lowercase().contains("more"),
            amount,
            kind: if text.contains('%') {
                MarginKind::Percent
            } else {
                MarginKind::Points
            },
        })
    }

    /// Resolve the "other side" of a comparison, folding duration into it
    /// and applying the trailing guard. `None` means the guard rejected
    /// the match and the caller should fall through.
    fn resolve_other(
        &self,
        statement: &str,
        caps: &regex::Captures<'_>,
        duration: Option<&str>,
        primary: &IndicatorReference,
        repeat_bars: Option<usize>,
    ) -> Result<Option<ValueOrRef>, TranslateError> {
        if let Some(val) = caps.name("other_val") {
            if Self::trailing_ok(statement, val.as_str(), duration.is_some()) {
                let parsed = val
                    .as_str()
                    .parse::<f64>()
                    .map_err(|_| TranslateError::UnrecognizedStatement(statement.to_string()))?;
                return Ok(Some(ValueOrRef::Value(parsed)));
            }
            return Ok(None);
        }
        if let Some(phrase) = caps.name("other_ind") {
            let mut other = self.resolver.resolve(phrase.as_str())?;
            if let (Some(text), Some(bars)) = (duration, repeat_bars) {
                Self::fold_duration_other(text, bars, primary.timeframe, &mut other);
            }
            if Self::trailing_ok(statement, phrase.as_str(), duration.is_some()) {
                return Ok(Some(ValueOrRef::Ref(other)));
            }
        }
        Ok(None)
    }

    fn try_above_below(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.above_below.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat_bars = self.fold_duration(duration, &mut value);
        let direction = parse_direction(&caps["above_below"]);
        let margin = caps
            .name("more_less")
            .map(|m| self.parse_margin(m.as_str()))
            .transpose()?;
        let other = match self.resolve_other(statement, &caps, duration, &value, repeat_bars)? {
            Some(o) => o,
            None => return Ok(None),
        };
        Ok(Some(StatementIr::AboveBelow {
            value,
            direction,
            margin,
            other,
            repeat: repeat_bars.unwrap_or(1),
        }))
    }

    fn try_between(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.between.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat_bars = self.fold_duration(duration, &mut value);

        let bound1 = if let Some(phrase) = caps.name("b1_ind") {
            let mut b = self.resolver.resolve(phrase.as_str())?;
            if let (Some(text), Some(bars)) = (duration, repeat_bars) {
                Self::fold_duration_other(text, bars, value.timeframe, &mut b);
            }
            ValueOrRef::Ref(b)
        } else {
            let raw = &caps["b1_val"];
            ValueOrRef::Value(raw.parse().map_err(|_| {
                TranslateError::UnrecognizedStatement(statement.to_string())
            })?)
        };

        // Only the second bound is at risk of absorbing a duration clause,
        // so only it carries the trailing guard.
        let bound2 = if let Some(phrase) = caps.name("b2_ind") {
            if !Self::trailing_ok(statement, phrase.as_str(), duration.is_some()) {
                return Ok(None);
            }
            let mut b = self.resolver.resolve(phrase.as_str())?;
            if let (Some(text), Some(bars)) = (duration, repeat_bars) {
                Self::fold_duration_other(text, bars, value.timeframe, &mut b);
            }
            ValueOrRef::Ref(b)
        } else {
            let raw = caps.name("b2_val").map(|m| m.as_str()).unwrap_or_default();
            if !Self::trailing_ok(statement, raw, duration.is_some()) {
                return Ok(None);
            }
            ValueOrRef::Value(raw.parse().map_err(|_| {
                TranslateError::UnrecognizedStatement(statement.to_string())
            })?)
        };

        Ok(Some(StatementIr::Between {
            value,
            bound1,
            bound2,
            repeat: repeat_bars.unwrap_or(1),
        }))
    }

    fn try_crossed(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.crossed.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat_bars = self.fold_duration(duration, &mut value);
        let direction = parse_direction(&caps["above_below"]);
        let other = match self.resolve_other(statement, &caps, duration, &value, repeat_bars)? {
            Some(o) => o,
            None => return Ok(None),
        };
        Ok(Some(StatementIr::Crossed {
            value,
            direction,
            other,
            repeat: repeat_bars.unwrap_or(1),
        }))
    }

    fn try_gained_dropped(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.gained_dropped.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat_bars = self.fold_duration(duration, &mut value);
        let comparator = &caps["more_less"];
        if !Self::trailing_ok(statement, comparator, duration.is_some()) {
            return Ok(None);
        }
        Ok(Some(StatementIr::GainedDropped {
            value,
            gained: caps["verb"].eq_ignore_ascii_case("gained"),
            margin: self.parse_margin(comparator)?,
            pair_distance: repeat_bars.unwrap_or(1),
        }))
    }

    fn try_increasing_decreasing(
        &self,
        statement: &str,
    ) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.increasing_decreasing.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let repeat = self
            .fold_duration(Some(&caps["duration"]), &mut value)
            .unwrap_or(1);
        Ok(Some(StatementIr::IncreasingDecreasing {
            value,
            increasing: caps["verb"].eq_ignore_ascii_case("increasing"),
            repeat,
        }))
    }

    fn try_reached_high_low(
        &self,
        statement: &str,
    ) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.reached_high_low.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let mut value = self.resolver.resolve(&caps["indicator"])?;
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat_bars = self.fold_duration(duration, &mut value);
        let high_low = &caps["high_low"];
        if !Self::trailing_ok(statement, high_low, duration.is_some()) {
            return Ok(None);
        }
        // "10 weeks high" → window of 10 weeks in the reference timeframe.
        let mut pieces = high_low.split_whitespace();
        let n: usize = pieces
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(|| TranslateError::UnrecognizedStatement(statement.to_string()))?;
        let unit = pieces
            .next()
            .and_then(crate::domain::PeriodUnit::parse)
            .ok_or_else(|| TranslateError::UnrecognizedStatement(statement.to_string()))?;
        let which = if high_low.to_ascii_lowercase().contains("high") {
            HighLow::High
        } else {
            HighLow::Low
        };
        let window = offset::convert(n, unit, value.timeframe);
        value.max_lookback += window;
        Ok(Some(StatementIr::ReachedHighLow {
            value,
            which,
            window,
            repeat: repeat_bars.unwrap_or(1),
        }))
    }

    fn try_top_bottom(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.top_bottom.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let direction = if caps["top_bottom"].eq_ignore_ascii_case("top") {
            RankDirection::Top
        } else {
            RankDirection::Bottom
        };
        let count: usize = caps["number"]
            .parse()
            .map_err(|_| TranslateError::UnrecognizedStatement(statement.to_string()))?;
        let basis = match caps.name("indicator") {
            Some(phrase) => RankBasis::Indicator(self.resolver.resolve(phrase.as_str())?),
            None => RankBasis::IbdRelativeStrength,
        };
        Ok(Some(StatementIr::TopBottom {
            direction,
            count,
            basis,
        }))
    }

    fn try_formed(&self, statement: &str) -> Result<Option<StatementIr>, TranslateError> {
        let caps = match self.formed.captures(statement) {
            Some(c) => c,
            None => return Ok(None),
        };
        let timeframe = caps
            .name("timeframe")
            .and_then(|m| Timeframe::parse(m.as_str()))
            .unwrap_or(Timeframe::Daily);
        let pattern = caps["cspattern"]
            .to_ascii_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        let duration = caps.name("duration").map(|m| m.as_str());
        let repeat = duration.and_then(|d| offset::duration_bars(d, timeframe));
        let ends_formed = statement
            .trim_end()
            .to_ascii_lowercase()
            .ends_with("formed");
        if repeat.is_none() && !ends_formed {
            return Ok(None);
        }
        Ok(Some(StatementIr::CandlestickFormed {
            timeframe,
            pattern,
            repeat: repeat.unwrap_or(1),
        }))
    }
}

fn parse_direction(text: &str) -> Direction {
    if text.eq_ignore_ascii_case("above") {
        Direction::Above
    } else {
        Direction::Below
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::Aggregation;

    fn translator() -> Translator {
        Translator::new(&IndicatorRegistry::builtin(), &PatternRegistry::builtin())
    }

    #[test]
    fn above_below_plain() {
        let ir = translator().translate("Volume MA(90) is above 100000.0").unwrap();
        match ir {
            StatementIr::AboveBelow {
                value,
                direction,
                margin,
                other,
                repeat,
            } => {
                assert_eq!(value.name, "volume ma(90)");
                assert_eq!(direction, Direction::Above);
                assert!(margin.is_none());
                assert_eq!(other, ValueOrRef::Value(100000.0));
                assert_eq!(repeat, 1);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn above_below_with_margin_and_duration() {
        let ir = translator()
            .translate("Close is more than 5% above MA(10) for the last 10 days")
            .unwrap();
        match ir {
            StatementIr::AboveBelow {
                value,
                margin,
                other,
                repeat,
                ..
            } => {
                assert_eq!(value.name, "close");
                // Duration inflates the history requirement, not the offset.
                assert_eq!(value.offset, 0);
                assert_eq!(value.max_lookback, 1 + 10);
                let margin = margin.unwrap();
                assert!(margin.more);
                assert_eq!(margin.kind, MarginKind::Percent);
                assert!((margin.amount - 5.0).abs() < 1e-12);
                match other {
                    ValueOrRef::Ref(r) => assert_eq!(r.max_lookback, 10 + 10),
                    v => panic!("expected reference, got {v:?}"),
                }
                assert_eq!(repeat, 10);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn duration_on_cross_timeframe_pair_reconverts() {
        let ir = translator()
            .translate(
                "Close 3 days ago has been more than 15% above weekly MA(50) 1 month ago for the last 2 weeks",
            )
            .unwrap();
        match ir {
            StatementIr::AboveBelow { value, other, repeat, .. } => {
                assert_eq!(value.timeframe, Timeframe::Daily);
                assert_eq!(value.offset, 3);
                // 1 (plain) + 3 (offset) + 10 (2 weeks of daily bars)
                assert_eq!(value.max_lookback, 14);
                assert_eq!(repeat, 10);
                match other {
                    ValueOrRef::Ref(r) => {
                        assert_eq!(r.timeframe, Timeframe::Weekly);
                        assert_eq!(r.offset, 4);
                        // 50 (param) + 4 (offset) + 2 (2 weeks of weekly bars)
                        assert_eq!(r.max_lookback, 56);
                    }
                    v => panic!("expected reference, got {v:?}"),
                }
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn between_statement() {
        let ir = translator().translate("Close is from 1.0 to 1999.9").unwrap();
        match ir {
            StatementIr::Between {
                bound1,
                bound2,
                repeat,
                ..
            } => {
                assert_eq!(bound1, ValueOrRef::Value(1.0));
                assert_eq!(bound2, ValueOrRef::Value(1999.9));
                assert_eq!(repeat, 1);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn between_with_aggregate_bound() {
        let ir = translator()
            .translate("avg(volume, 22) is from volume ma(10) 1 week ago to 9999999999")
            .unwrap();
        match ir {
            StatementIr::Between { value, bound1, .. } => {
                assert_eq!(value.aggregation, Aggregation::Avg);
                match bound1 {
                    ValueOrRef::Ref(r) => {
                        assert_eq!(r.name, "volume ma(10)");
                        assert_eq!(r.offset, 5);
                    }
                    v => panic!("expected reference, got {v:?}"),
                }
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn crossed_with_duration() {
        let ir = translator()
            .translate("EMA(10) crossed above EMA(50) within the last 5 days")
            .unwrap();
        match ir {
            StatementIr::Crossed {
                value,
                direction,
                other,
                repeat,
            } => {
                assert_eq!(value.name, "ema(10)");
                assert_eq!(value.max_lookback, 15);
                assert_eq!(direction, Direction::Above);
                assert_eq!(repeat, 5);
                match other {
                    ValueOrRef::Ref(r) => assert_eq!(r.name, "ema(50)"),
                    v => panic!("expected reference, got {v:?}"),
                }
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn crossed_against_constant() {
        let ir = translator().translate("EMA(10) 2 days ago crossed above 50").unwrap();
        match ir {
            StatementIr::Crossed { value, other, repeat, .. } => {
                assert_eq!(value.offset, 2);
                assert_eq!(other, ValueOrRef::Value(50.0));
                assert_eq!(repeat, 1);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn gained_dropped_pair_distance() {
        let ir = translator()
            .translate("weekly EMA(10) 1 week ago dropped more than 30% over the last 1 month")
            .unwrap();
        match ir {
            StatementIr::GainedDropped {
                value,
                gained,
                margin,
                pair_distance,
            } => {
                assert_eq!(value.timeframe, Timeframe::Weekly);
                assert_eq!(value.offset, 1);
                assert!(!gained);
                assert!(margin.more);
                assert_eq!(margin.kind, MarginKind::Percent);
                // 1 month = 4 weekly bars between the compared values.
                assert_eq!(pair_distance, 4);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn increasing_requires_duration() {
        let ir = translator()
            .translate("Median Bollinger Band (20.0,  2.5) has been increasing for 20 days")
            .unwrap();
        match ir {
            StatementIr::IncreasingDecreasing {
                value,
                increasing,
                repeat,
            } => {
                assert_eq!(value.name, "median bollinger band(20.0,2.5)");
                assert!(increasing);
                assert_eq!(repeat, 20);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert!(translator().translate("EMA(10) has been increasing").is_err());
    }

    #[test]
    fn reached_high_low_window_and_repeat() {
        let ir = translator()
            .translate("EMA(10) 1 week ago reached a new 10 weeks high within the last 6 days")
            .unwrap();
        match ir {
            StatementIr::ReachedHighLow {
                value,
                which,
                window,
                repeat,
            } => {
                assert_eq!(value.timeframe, Timeframe::Daily);
                assert_eq!(value.offset, 5);
                assert_eq!(which, HighLow::High);
                // 10 weeks = 50 daily bars.
                assert_eq!(window, 50);
                assert_eq!(repeat, 6);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn top_bottom_ibd() {
        let ir = translator().translate("bottom   20 IBD  Relative   Strength").unwrap();
        assert_eq!(
            ir,
            StatementIr::TopBottom {
                direction: RankDirection::Bottom,
                count: 20,
                basis: RankBasis::IbdRelativeStrength,
            }
        );
    }

    #[test]
    fn top_bottom_indicator() {
        let ir = translator().translate("top 10 weekly RSI(14)").unwrap();
        match ir {
            StatementIr::TopBottom { direction, count, basis } => {
                assert_eq!(direction, RankDirection::Top);
                assert_eq!(count, 10);
                match basis {
                    RankBasis::Indicator(r) => {
                        assert_eq!(r.timeframe, Timeframe::Weekly);
                        assert_eq!(r.name, "rsi(14)");
                    }
                    b => panic!("expected indicator basis, got {b:?}"),
                }
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn candlestick_formed() {
        let ir = translator()
            .translate("Bullish Harami formed within the last 2 days")
            .unwrap();
        assert_eq!(
            ir,
            StatementIr::CandlestickFormed {
                timeframe: Timeframe::Daily,
                pattern: "bullish harami".to_string(),
                repeat: 2,
            }
        );
        let ir = translator().translate("weekly Morning Star has formed").unwrap();
        assert_eq!(
            ir,
            StatementIr::CandlestickFormed {
                timeframe: Timeframe::Weekly,
                pattern: "morning star".to_string(),
                repeat: 1,
            }
        );
    }

    #[test]
    fn wildcard_pattern_name() {
        let ir = translator()
            .translate("Bullish candlestick pattern formed within the last 3 days")
            .unwrap();
        match ir {
            StatementIr::CandlestickFormed { pattern, repeat, .. } => {
                assert_eq!(pattern, "bullish candlestick pattern");
                assert_eq!(repeat, 3);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unrecognized_statement_errors() {
        let err = translator().translate("close is wobbling around").unwrap_err();
        assert!(matches!(err, TranslateError::UnrecognizedStatement(_)));
    }

    #[test]
    fn trailing_guard_rejects_partial_duration_absorption() {
        // Without a duration clause, a trailing capture that is not the
        // literal statement suffix must not be accepted as a value.
        let t = translator();
        let ok = t.translate("close is above 5").unwrap();
        assert!(matches!(ok, StatementIr::AboveBelow { .. }));
        // Trailing whitespace is trimmed before the suffix check.
        let ok = t.translate("close is above 5   ").unwrap();
        assert!(matches!(ok, StatementIr::AboveBelow { .. }));
    }

    #[test]
    fn translation_is_deterministic() {
        let t = translator();
        let text = "MACD(12,   26,9) has crossed above MAX ( MACD  Signal ( 12, 26, 9 ), 10) within the last 5 days";
        let a = t.translate(text).unwrap();
        let b = t.translate(text).unwrap();
        assert_eq!(a, b);
    }
}
