//! History planning: how many bars of each timeframe a rule needs.
//!
//! Derived once per rule from the compiled translation, before any symbol
//! is touched. Every per-bar access the evaluator performs stays within
//! the reference's recorded history requirement, so a fetch sized from
//! this plan can never be out-walked at evaluation time.

use crate::domain::Timeframe;
use crate::lang::{StatementIr, Translation};
use std::collections::BTreeMap;

/// Extra bars a candlestick detector may read behind the probed bar
/// (three-bar shapes plus trend context).
const PATTERN_CONTEXT_BARS: usize = 5;

/// Per-timeframe maximum history requirement, in bars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeframeNeeds(BTreeMap<Timeframe, usize>);

impl TimeframeNeeds {
    pub fn from_translation(translation: &Translation) -> Self {
        let mut needs = BTreeMap::new();
        let mut record = |tf: Timeframe, bars: usize| {
            let slot = needs.entry(tf).or_insert(0);
            *slot = (*slot).max(bars);
        };
        for (_, ir) in &translation.statements {
            for reference in ir.references() {
                record(reference.timeframe, reference.max_lookback);
            }
            if let StatementIr::CandlestickFormed {
                timeframe, repeat, ..
            } = ir
            {
                record(*timeframe, repeat + PATTERN_CONTEXT_BARS);
            }
        }
        Self(needs)
    }

    /// Bars needed for `timeframe`; zero when the rule never touches it.
    pub fn bars(&self, timeframe: Timeframe) -> usize {
        self.0.get(&timeframe).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Timeframe, usize)> + '_ {
        self.0.iter().map(|(tf, bars)| (*tf, *bars))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorRegistry;
    use crate::lang::{compile, Translator};
    use crate::patterns::PatternRegistry;

    fn plan(expression: &str) -> TimeframeNeeds {
        let translator =
            Translator::new(&IndicatorRegistry::builtin(), &PatternRegistry::builtin());
        TimeframeNeeds::from_translation(&compile(expression, &translator).unwrap())
    }

    #[test]
    fn takes_maximum_per_timeframe() {
        let needs = plan("MA(50) is above MA(200) and close is above 5");
        // ma(200) dominates the daily requirement.
        assert_eq!(needs.bars(Timeframe::Daily), 200);
        assert_eq!(needs.bars(Timeframe::Weekly), 0);
    }

    #[test]
    fn duration_inflates_the_requirement() {
        let needs = plan("EMA(10) crossed above EMA(50) within the last 5 days");
        assert_eq!(needs.bars(Timeframe::Daily), 55);
    }

    #[test]
    fn mixed_timeframes_are_tracked_separately() {
        let needs = plan("weekly RSI(14) is above 50 and close is above MA(20)");
        assert_eq!(needs.bars(Timeframe::Weekly), 14);
        assert_eq!(needs.bars(Timeframe::Daily), 20);
        let collected: Vec<_> = needs.iter().collect();
        assert_eq!(collected.len(), 2);
    }

    #[test]
    fn candlestick_statements_reserve_context() {
        let needs = plan("Bullish Engulfing formed within the last 3 days");
        assert_eq!(needs.bars(Timeframe::Daily), 3 + 5);
    }
}
