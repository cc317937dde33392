//! Folding the boolean expression over per-statement truths.

use crate::eval::EvalError;
use crate::lang::BoolExpr;

pub(crate) fn fold(expr: &BoolExpr, truths: &[bool]) -> Result<bool, EvalError> {
    match expr {
        BoolExpr::Leaf(index) => truths
            .get(*index)
            .copied()
            .ok_or(EvalError::Combine(*index)),
        BoolExpr::Not(inner) => Ok(!fold(inner, truths)?),
        BoolExpr::And(terms) => {
            for term in terms {
                if !fold(term, truths)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        BoolExpr::Or(terms) => {
            for term in terms {
                if fold(term, truths)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
    }
}
