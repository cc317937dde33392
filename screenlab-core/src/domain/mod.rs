//! Domain types: bars, OHLCV tables, timeframes.

mod bar;
mod timeframe;

pub use bar::{Bar, Column, OhlcvTable};
pub use timeframe::{PeriodUnit, Timeframe};

#[cfg(test)]
pub use bar::make_bars;
