//! ScreenLab Core — rule language, indicator math, pattern detection,
//! per-symbol evaluation.
//!
//! This crate contains the heart of the screening engine:
//! - Domain types (bars, columns, timeframes, durations)
//! - Statement splitter and boolean expression parser
//! - Eight statement grammars compiling free text to a typed IR
//! - Indicator registry and full-series indicator math
//! - Candlestick pattern registry and detectors
//! - History planner (bars needed per timeframe)
//! - Per-symbol evaluator with memoized series materialization

pub mod domain;
pub mod eval;
pub mod indicators;
pub mod lang;
pub mod patterns;
pub mod plan;
