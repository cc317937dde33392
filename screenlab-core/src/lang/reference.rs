//! Indicator phrase resolution.
//!
//! Turns a phrase like "weekly min(ema(10), 5) 2 weeks ago" into a typed
//! [`IndicatorReference`]. The grammar accepts an optional timeframe
//! prefix, a plain field or a registered function invocation (optionally
//! wrapped in a min/max/avg aggregation with a range), and an optional
//! "N <period> ago" offset. Function names come from the registry,
//! longest-name-first.

use crate::domain::{Column, Timeframe};
use crate::indicators::IndicatorRegistry;
use crate::lang::{offset, TranslateError};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a reference reads its series: a single bar, or a reduction over a
/// trailing window of `agg_range` bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    None,
    Min,
    Max,
    Avg,
}

/// A fully resolved indicator reference. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReference {
    pub timeframe: Timeframe,
    /// Canonical series name: lowercase, collapsed whitespace, no spaces
    /// inside the parameter list ("close", "ema(10)", "macd(12,26,9)").
    pub name: String,
    /// Base bars-ago offset from the "N <period> ago" clause.
    pub offset: usize,
    pub aggregation: Aggregation,
    /// Window length for min/max/avg; 0 iff aggregation is None.
    pub agg_range: usize,
    /// Bars of history this reference needs: largest numeric parameter in
    /// the function's argument list (default 1) + agg_range + offset.
    /// Duration folding may increase it further.
    pub max_lookback: usize,
}

impl IndicatorReference {
    /// Key the materializer memoizes the underlying series under.
    pub fn series_key(&self) -> (Timeframe, &str) {
        (self.timeframe, &self.name)
    }

    /// The plain column this reference names, if it is not a function.
    pub fn plain_column(&self) -> Option<Column> {
        Column::parse(&self.name)
    }
}

/// Period keywords, longest alternatives first so "days" wins over "day".
pub(crate) const PERIOD: &str = r"(?:days|weeks|months|day|week|month)";

/// Compiled phrase grammar. Built once per registry and reused for every
/// statement of every rule.
#[derive(Debug)]
pub struct ReferenceResolver {
    plain_re: Regex,
    aggregate_re: Regex,
}

/// Non-capturing fragment matching a plain field or registered function
/// invocation.
pub(crate) fn plain_fragment(registry: &IndicatorRegistry) -> String {
    format!(
        r"(?:{}|open|high|low|close|volume|range)",
        registry.function_pattern()
    )
}

/// Non-capturing fragment matching a whole indicator phrase, aggregation
/// and offset clauses included. Embedded into the statement grammars.
pub(crate) fn phrase_fragment(registry: &IndicatorRegistry) -> String {
    let plain = plain_fragment(registry);
    format!(
        r"(?:(?:daily|weekly|monthly)\s+)?(?:{plain}|(?:min|max|avg)\s*\(\s*{plain},\s*[1-9]\d*\s*\))(?:\s+[1-9]\d*\s+{PERIOD}\s+ago)?"
    )
}

impl ReferenceResolver {
    pub fn new(registry: &IndicatorRegistry) -> Self {
        let plain = plain_fragment(registry);
        let tail = format!(r"(?:\s+(?P<n>[1-9]\d*)\s+(?P<unit>{PERIOD})\s+ago)?\s*$");
        let plain_re = Regex::new(&format!(
            r"(?i)^\s*(?:(?P<timeframe>daily|weekly|monthly)\s+)?(?P<indicator>{plain}){tail}"
        ))
        .expect("plain indicator grammar must compile");
        let aggregate_re = Regex::new(&format!(
            r"(?i)^\s*(?:(?P<timeframe>daily|weekly|monthly)\s+)?(?P<agg>min|max|avg)\s*\(\s*(?P<indicator>{plain}),\s*(?P<range>[1-9]\d*)\s*\){tail}"
        ))
        .expect("aggregate indicator grammar must compile");
        Self {
            plain_re,
            aggregate_re,
        }
    }

    /// Resolve a phrase into a typed reference.
    pub fn resolve(&self, phrase: &str) -> Result<IndicatorReference, TranslateError> {
        if let Some(caps) = self.aggregate_re.captures(phrase) {
            let aggregation = match caps["agg"].to_ascii_lowercase().as_str() {
                "min" => Aggregation::Min,
                "max" => Aggregation::Max,
                _ => Aggregation::Avg,
            };
            let agg_range: usize = caps["range"]
                .parse()
                .map_err(|_| TranslateError::IndicatorResolution(phrase.to_string()))?;
            return self.build(phrase, &caps, aggregation, agg_range);
        }
        if let Some(caps) = self.plain_re.captures(phrase) {
            return self.build(phrase, &caps, Aggregation::None, 0);
        }
        Err(TranslateError::IndicatorResolution(phrase.to_string()))
    }

    fn build(
        &self,
        phrase: &str,
        caps: &regex::Captures<'_>,
        aggregation: Aggregation,
        agg_range: usize,
    ) -> Result<IndicatorReference, TranslateError> {
        let timeframe = caps
            .name("timeframe")
            .and_then(|m| Timeframe::parse(m.as_str()))
            .unwrap_or(Timeframe::Daily);
        let name = canonical_name(&caps["indicator"]);
        let offset = match (caps.name("n"), caps.name("unit")) {
            (Some(n), Some(unit)) => {
                let n: usize = n
                    .as_str()
                    .parse()
                    .map_err(|_| TranslateError::IndicatorResolution(phrase.to_string()))?;
                let unit = crate::domain::PeriodUnit::parse(unit.as_str())
                    .ok_or_else(|| TranslateError::IndicatorResolution(phrase.to_string()))?;
                offset::convert(n, unit, timeframe)
            }
            _ => 0,
        };
        let max_lookback = IndicatorRegistry::max_parameter(&name) + agg_range + offset;
        Ok(IndicatorReference {
            timeframe,
            name,
            offset,
            aggregation,
            agg_range,
            max_lookback,
        })
    }
}

/// Normalize an indicator spelling: lowercase, inner whitespace collapsed,
/// no whitespace inside the parameter list.
fn canonical_name(raw: &str) -> String {
    let lower = raw.trim().to_ascii_lowercase();
    match lower.split_once('(') {
        None => lower.split_whitespace().collect::<Vec<_>>().join(" "),
        Some((head, params)) => {
            let head = head.split_whitespace().collect::<Vec<_>>().join(" ");
            let params: String = params.split_whitespace().collect();
            format!("{head}({params}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> ReferenceResolver {
        ReferenceResolver::new(&IndicatorRegistry::builtin())
    }

    #[test]
    fn plain_field_defaults_to_daily() {
        for phrase in ["close", "open", "volume", "range", "ema(10)", "rsi(14)"] {
            let r = resolver().resolve(phrase).unwrap();
            assert_eq!(r.timeframe, Timeframe::Daily, "{phrase}");
            assert_eq!(r.offset, 0);
            assert_eq!(r.aggregation, Aggregation::None);
        }
    }

    #[test]
    fn timeframe_prefix_and_offset() {
        let r = resolver().resolve("weekly ema(10) 2 weeks ago").unwrap();
        assert_eq!(r.timeframe, Timeframe::Weekly);
        assert_eq!(r.name, "ema(10)");
        assert_eq!(r.offset, 2);
        assert_eq!(r.max_lookback, 12);
    }

    #[test]
    fn offset_converts_units_to_the_reference_timeframe() {
        let r = resolver().resolve("close 1 month ago").unwrap();
        assert_eq!(r.offset, 20);
        let r = resolver().resolve("weekly close 10 days ago").unwrap();
        assert_eq!(r.offset, 2);
    }

    #[test]
    fn aggregate_phrase() {
        let r = resolver().resolve("avg(volume, 22)").unwrap();
        assert_eq!(r.aggregation, Aggregation::Avg);
        assert_eq!(r.agg_range, 22);
        assert_eq!(r.name, "volume");
        assert_eq!(r.max_lookback, 23);
    }

    #[test]
    fn aggregate_over_function_with_offset() {
        let r = resolver()
            .resolve("max ( macd signal ( 12, 26, 9 ), 10) 1 day ago")
            .unwrap();
        assert_eq!(r.aggregation, Aggregation::Max);
        assert_eq!(r.name, "macd signal(12,26,9)");
        assert_eq!(r.agg_range, 10);
        assert_eq!(r.offset, 1);
        assert_eq!(r.max_lookback, 26 + 10 + 1);
    }

    #[test]
    fn longest_function_name_wins() {
        // "macd histogram" must not resolve as "macd" with leftovers.
        let r = resolver().resolve("macd histogram(12,26,9)").unwrap();
        assert_eq!(r.name, "macd histogram(12,26,9)");
        // "volume ma" must not resolve as the "ma" function.
        let r = resolver().resolve("Volume MA ( 90 )").unwrap();
        assert_eq!(r.name, "volume ma(90)");
    }

    #[test]
    fn canonicalization_collapses_whitespace() {
        let r = resolver().resolve("MACD ( 12,   26, 9 )").unwrap();
        assert_eq!(r.name, "macd(12,26,9)");
        let r = resolver().resolve("Aroon   Up(63)").unwrap();
        assert_eq!(r.name, "aroon up(63)");
    }

    #[test]
    fn unknown_function_is_a_resolution_error() {
        let err = resolver().resolve("vwap(30)").unwrap_err();
        assert!(matches!(err, TranslateError::IndicatorResolution(_)));
    }

    #[test]
    fn wrong_arity_is_a_resolution_error() {
        assert!(resolver().resolve("ema(10, 20)").is_err());
        assert!(resolver().resolve("macd(12)").is_err());
    }

    #[test]
    fn resolution_is_deterministic() {
        let a = resolver().resolve("weekly +di(13)").unwrap();
        let b = resolver().resolve("weekly +di(13)").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.name, "+di(13)");
    }

    #[test]
    fn max_lookback_uses_largest_parameter() {
        let r = resolver().resolve("macd(12,26,9) 3 days ago").unwrap();
        assert_eq!(r.max_lookback, 26 + 3);
    }
}
