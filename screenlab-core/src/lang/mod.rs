//! The rule language: splitter, statement translator, indicator reference
//! resolver, and duration conversion.
//!
//! A raw rule ("EMA(10) crossed above MA(50) within the last 5 days and
//! close is above 5") is split into atomic statements plus a boolean
//! expression over them, and each statement is compiled into a typed
//! [`StatementIr`]. Translation happens once per rule; the result is
//! shared read-only across every symbol evaluation.

mod offset;
mod reference;
mod splitter;
mod statement;

pub use offset::{convert, duration_bars, parse_duration};
pub use reference::{Aggregation, IndicatorReference, ReferenceResolver};
pub use splitter::{split_expression, BoolExpr, SplitExpression};
pub use statement::{
    Direction, HighLow, Margin, MarginKind, RankBasis, RankDirection, StatementIr, Translator,
    ValueOrRef,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Translation-time failures. All of these are fatal for the rule and are
/// surfaced to the caller; none of them occur during per-symbol evaluation.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Splitter guard violation, e.g. a top/bottom rule mixed with other
    /// statements.
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    /// No grammar matched the statement.
    #[error(
        "'{0}' is unrecognizable; check it against the acceptable syntax and make sure the \
         indicator or pattern name is spelled correctly with its required parameters"
    )]
    UnrecognizedStatement(String),
    /// The statement matched, but an indicator phrase inside it did not
    /// resolve.
    #[error("cannot resolve indicator phrase '{0}'")]
    IndicatorResolution(String),
}

/// Compiled form of one rule: the ordered statement list and the boolean
/// expression over statement indexes. Persisted as JSON by the
/// translation store so repeat runs skip re-translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub statements: Vec<(String, StatementIr)>,
    pub expr: BoolExpr,
}

impl Translation {
    /// True when this rule is a single top/bottom ranking statement.
    pub fn ranking(&self) -> Option<&StatementIr> {
        match self.statements.as_slice() {
            [(_, ir @ StatementIr::TopBottom { .. })] => Some(ir),
            _ => None,
        }
    }
}

/// Split and translate a raw rule into a [`Translation`].
pub fn compile(expression: &str, translator: &Translator) -> Result<Translation, TranslateError> {
    let split = split_expression(expression)?;
    let mut statements = Vec::with_capacity(split.statements.len());
    for text in &split.statements {
        tracing::debug!(statement = %text, "translating");
        let ir = translator.translate(text)?;
        statements.push((text.clone(), ir));
    }
    Ok(Translation {
        statements,
        expr: split.expr,
    })
}
