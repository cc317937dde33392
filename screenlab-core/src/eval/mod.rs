//! Per-symbol evaluation of a compiled rule.
//!
//! One [`Evaluator`] is shared read-only across symbols; each call builds
//! a private series cache for that symbol's history, computes every
//! statement's truth value independently, and folds the boolean
//! expression last. Missing values make a statement false, never an
//! error, so ragged or short histories degrade to non-matches. Errors are
//! reserved for structural problems that spell a bug or a malformed
//! translation, not for data shape.

mod access;
mod combine;
mod materialize;
mod statement;

pub(crate) use access::{reindex, value_at};
pub(crate) use materialize::SeriesBank;

use crate::domain::{OhlcvTable, Timeframe};
use crate::indicators::IndicatorRegistry;
use crate::lang::{RankBasis, StatementIr, Translation};
use crate::patterns::PatternRegistry;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    /// A repeat index in a coarse timeframe cannot be remapped onto a
    /// finer one; the finer series has no single bar for it.
    #[error("cannot remap a {from} repeat index onto the finer {to} timeframe")]
    Reindex { from: Timeframe, to: Timeframe },
    /// The boolean expression references a statement index that does not
    /// exist in the translation.
    #[error("boolean expression references statement {0} out of range")]
    Combine(usize),
    #[error("internal evaluation error: {0}")]
    Internal(String),
}

/// One symbol's history, one table per timeframe.
#[derive(Debug, Clone, Default)]
pub struct SymbolHistory {
    tables: BTreeMap<Timeframe, OhlcvTable>,
}

impl SymbolHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, timeframe: Timeframe, table: OhlcvTable) {
        self.tables.insert(timeframe, table);
    }

    pub fn table(&self, timeframe: Timeframe) -> Option<&OhlcvTable> {
        self.tables.get(&timeframe)
    }

    /// Bars available at `timeframe`; zero when the table is absent.
    pub fn bars(&self, timeframe: Timeframe) -> usize {
        self.tables.get(&timeframe).map_or(0, OhlcvTable::len)
    }
}

/// Stateless rule evaluator over the two registries.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    indicators: &'a IndicatorRegistry,
    patterns: &'a PatternRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(indicators: &'a IndicatorRegistry, patterns: &'a PatternRegistry) -> Self {
        Self {
            indicators,
            patterns,
        }
    }

    /// Evaluate a boolean (non-ranking) rule against one symbol.
    pub fn evaluate(
        &self,
        translation: &Translation,
        history: &SymbolHistory,
    ) -> Result<bool, EvalError> {
        if translation.ranking().is_some() {
            return Err(EvalError::Internal(
                "ranking rule evaluated as a boolean filter".to_string(),
            ));
        }
        let mut bank = SeriesBank::new(history, self.indicators);
        let mut truths = Vec::with_capacity(translation.statements.len());
        for (text, ir) in &translation.statements {
            let truth = statement::evaluate(&mut bank, self.patterns, ir)?;
            tracing::trace!(statement = %text, truth, "statement evaluated");
            truths.push(truth);
        }
        combine::fold(&translation.expr, &truths)
    }

    /// Score one symbol for a ranking rule. `None` drops the symbol from
    /// the ranking (missing history, NaN warmup, unscorable basis).
    pub fn ranking_score(
        &self,
        basis: &RankBasis,
        history: &SymbolHistory,
    ) -> Result<Option<f64>, EvalError> {
        match basis {
            // Catalog scalars are the caller's job; there is nothing to
            // compute from history.
            RankBasis::IbdRelativeStrength => Err(EvalError::Internal(
                "catalog-based ranking scored from history".to_string(),
            )),
            RankBasis::Indicator(reference) => {
                let mut bank = SeriesBank::new(history, self.indicators);
                Ok(value_at(&mut bank, reference, 1))
            }
        }
    }
}

/// Truth of a single statement against one symbol, bypassing the boolean
/// fold. Used by tests and diagnostic tooling.
pub fn evaluate_statement(
    indicators: &IndicatorRegistry,
    patterns: &PatternRegistry,
    ir: &StatementIr,
    history: &SymbolHistory,
) -> Result<bool, EvalError> {
    let mut bank = SeriesBank::new(history, indicators);
    statement::evaluate(&mut bank, patterns, ir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::make_bars;
    use crate::lang::{Aggregation, Direction, IndicatorReference, Margin, MarginKind, ValueOrRef};

    fn close_reference() -> IndicatorReference {
        IndicatorReference {
            timeframe: Timeframe::Daily,
            name: "close".to_string(),
            offset: 0,
            aggregation: Aggregation::None,
            agg_range: 0,
            max_lookback: 1,
        }
    }

    fn above(level: f64, margin: Option<Margin>) -> StatementIr {
        StatementIr::AboveBelow {
            value: close_reference(),
            direction: Direction::Above,
            margin,
            other: ValueOrRef::Value(level),
            repeat: 1,
        }
    }

    fn truth(ir: &StatementIr, closes: &[f64]) -> bool {
        let mut history = SymbolHistory::new();
        history.insert(Timeframe::Daily, OhlcvTable::from_bars(&make_bars(closes)));
        let indicators = IndicatorRegistry::builtin();
        let patterns = PatternRegistry::builtin();
        evaluate_statement(&indicators, &patterns, ir, &history).unwrap()
    }

    #[test]
    fn plain_comparison_is_inclusive() {
        assert!(truth(&above(10.0, None), &[10.0]));
        assert!(!truth(&above(10.0, None), &[9.9]));
    }

    #[test]
    fn percent_margin_is_anchored_on_the_level_magnitude() {
        let margin = Margin {
            more: true,
            amount: 10.0,
            kind: MarginKind::Percent,
        };
        // 10% above -100 is -90.
        assert!(truth(&above(-100.0, Some(margin)), &[-90.0]));
        assert!(!truth(&above(-100.0, Some(margin)), &[-95.0]));
    }
}
