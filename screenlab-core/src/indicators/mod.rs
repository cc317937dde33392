//! Indicator function registry.
//!
//! Maps the spelled-out function names the rule language accepts
//! ("ema", "macd signal", "upper bollinger band", …) to typed
//! descriptors: which computation to run, which price columns it reads,
//! and how many numeric parameters it takes. The resolver validates
//! phrases against this registry; the materializer dispatches through it.
//! Invocation is ordinary dispatch over an enum, never string-built calls.

pub mod math;

use crate::domain::{Column, OhlcvTable};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndicatorError {
    #[error("unknown indicator function '{0}'")]
    UnknownFunction(String),
    #[error("'{name}' expects {expected} parameter(s), got {got}")]
    BadArity {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("bad indicator parameter '{0}'")]
    BadParameter(String),
}

/// Which computation a registry entry dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Computation {
    Sma,
    VolumeSma,
    Ema,
    Rsi,
    Roc,
    Atr,
    Adx,
    PlusDi,
    MinusDi,
    AroonUp,
    AroonDown,
    Cci,
    Macd,
    MacdSignal,
    MacdHistogram,
    BollingerUpper,
    BollingerLower,
    BollingerMiddle,
}

/// Per-name parameter transforms the original syntax requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quirk {
    None,
    /// MACD-family names take parameters in (fast, slow, …) order but the
    /// computation wants (slow, fast, …): swap the first two.
    SwapFirstTwo,
    /// "median bollinger band" keeps the conventional 2-parameter spelling
    /// but the computation only needs the period.
    FirstParamOnly,
}

/// One registry entry.
#[derive(Debug, Clone)]
pub struct IndicatorSpec {
    pub name: &'static str,
    pub computation: Computation,
    pub inputs: &'static [Column],
    pub arity: usize,
    pub quirk: Quirk,
}

const CLOSE: &[Column] = &[Column::Close];
const VOLUME: &[Column] = &[Column::Volume];
const HLC: &[Column] = &[Column::High, Column::Low, Column::Close];

/// Registry of indicator functions, ordered longest-name-first so a name
/// that is a prefix of another ("ma" vs "macd signal") can never wrongly
/// win a grammar match.
#[derive(Debug, Clone)]
pub struct IndicatorRegistry {
    specs: Vec<IndicatorSpec>,
}

impl IndicatorRegistry {
    /// The built-in function set.
    pub fn builtin() -> Self {
        use Computation::*;
        let mut specs = vec![
            spec("ma", Sma, CLOSE, 1, Quirk::None),
            spec("sma", Sma, CLOSE, 1, Quirk::None),
            spec("volume ma", VolumeSma, VOLUME, 1, Quirk::None),
            spec("ema", Ema, CLOSE, 1, Quirk::None),
            spec("rsi", Rsi, CLOSE, 1, Quirk::None),
            spec("roc", Roc, CLOSE, 1, Quirk::None),
            spec("atr", Atr, HLC, 1, Quirk::None),
            spec("adx", Adx, HLC, 1, Quirk::None),
            spec("+di", PlusDi, HLC, 1, Quirk::None),
            spec("-di", MinusDi, HLC, 1, Quirk::None),
            spec("cci", Cci, HLC, 1, Quirk::None),
            spec("aroon up", AroonUp, CLOSE, 1, Quirk::None),
            spec("aroon down", AroonDown, CLOSE, 1, Quirk::None),
            spec("macd", Macd, CLOSE, 3, Quirk::SwapFirstTwo),
            spec("macd signal", MacdSignal, CLOSE, 3, Quirk::SwapFirstTwo),
            spec("macd histogram", MacdHistogram, CLOSE, 3, Quirk::SwapFirstTwo),
            spec("upper bollinger band", BollingerUpper, CLOSE, 2, Quirk::None),
            spec("lower bollinger band", BollingerLower, CLOSE, 2, Quirk::None),
            spec("median bollinger band", BollingerMiddle, CLOSE, 2, Quirk::FirstParamOnly),
        ];
        // Longest name first; ties broken alphabetically for determinism.
        specs.sort_by(|a, b| b.name.len().cmp(&a.name.len()).then(a.name.cmp(b.name)));
        Self { specs }
    }

    /// Look up a function by its lowercase, whitespace-collapsed name.
    pub fn lookup(&self, name: &str) -> Option<&IndicatorSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    pub fn specs(&self) -> &[IndicatorSpec] {
        &self.specs
    }

    /// Regex fragment matching any registered function invocation with its
    /// exact parameter arity, e.g. `macd\s+signal\s*\(\s*12,\s*26,\s*9\s*\)`.
    /// Alternatives are emitted longest-name-first.
    pub fn function_pattern(&self) -> String {
        let alternatives: Vec<String> = self
            .specs
            .iter()
            .map(|s| {
                let name = regex::escape(s.name).replace(' ', r"\s+");
                let first = r"\d+\.?\d*";
                let rest = r"(?:,\s*\d+\.?\d*)".repeat(s.arity.saturating_sub(1));
                format!(r"{name}\s*\(\s*{first}{rest}\s*\)")
            })
            .collect();
        alternatives.join("|")
    }

    /// Compute the full-length series for a canonical function invocation
    /// like "macd(12,26,9)" over one OHLCV table.
    pub fn compute(&self, canonical: &str, table: &OhlcvTable) -> Result<Vec<f64>, IndicatorError> {
        let open = canonical
            .find('(')
            .ok_or_else(|| IndicatorError::UnknownFunction(canonical.to_string()))?;
        let name = canonical[..open].trim();
        let spec = self
            .lookup(name)
            .ok_or_else(|| IndicatorError::UnknownFunction(name.to_string()))?;

        let args = canonical[open + 1..].trim_end_matches(')');
        let mut params: Vec<f64> = Vec::new();
        for piece in args.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            params.push(
                piece
                    .parse()
                    .map_err(|_| IndicatorError::BadParameter(piece.to_string()))?,
            );
        }
        if params.len() != spec.arity {
            return Err(IndicatorError::BadArity {
                name: spec.name.to_string(),
                expected: spec.arity,
                got: params.len(),
            });
        }

        match spec.quirk {
            Quirk::None => {}
            Quirk::SwapFirstTwo => params.swap(0, 1),
            Quirk::FirstParamOnly => params.truncate(1),
        }

        let period = |i: usize| params[i] as usize;
        use Computation::*;
        let series = match spec.computation {
            Sma => math::sma(&table.close, period(0)),
            VolumeSma => math::sma(&table.volume, period(0)),
            Ema => math::ema(&table.close, period(0)),
            Rsi => math::rsi(&table.close, period(0)),
            Roc => math::roc(&table.close, period(0)),
            Atr => math::atr(&table.high, &table.low, &table.close, period(0)),
            Adx => math::adx(&table.high, &table.low, &table.close, period(0)),
            PlusDi => math::plus_di(&table.high, &table.low, &table.close, period(0)),
            MinusDi => math::minus_di(&table.high, &table.low, &table.close, period(0)),
            Cci => math::cci(&table.high, &table.low, &table.close, period(0)),
            AroonUp => math::aroon_up(&table.close, period(0)),
            AroonDown => math::aroon_down(&table.close, period(0)),
            // Post-quirk order: (slow, fast, [signal]).
            Macd => math::macd(&table.close, period(0), period(1)),
            MacdSignal => math::macd_signal(&table.close, period(0), period(1), period(2)),
            MacdHistogram => math::macd_histogram(&table.close, period(0), period(1), period(2)),
            BollingerUpper => math::bollinger_upper(&table.close, period(0), params[1]),
            BollingerLower => math::bollinger_lower(&table.close, period(0), params[1]),
            BollingerMiddle => math::bollinger_middle(&table.close, period(0)),
        };
        Ok(series)
    }

    /// Largest integer parameter of a canonical invocation, the basis of a
    /// reference's history requirement. 1 for plain fields.
    pub fn max_parameter(canonical: &str) -> usize {
        let mut max = 1usize;
        if let Some(open) = canonical.find('(') {
            for piece in canonical[open + 1..].trim_end_matches(')').split(',') {
                if let Ok(v) = piece.trim().parse::<f64>() {
                    max = max.max(v as usize);
                }
            }
        }
        max
    }
}

fn spec(
    name: &'static str,
    computation: Computation,
    inputs: &'static [Column],
    arity: usize,
    quirk: Quirk,
) -> IndicatorSpec {
    IndicatorSpec {
        name,
        computation,
        inputs,
        arity,
        quirk,
    }
}
