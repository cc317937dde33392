//! Candlestick pattern detectors.
//!
//! Each detector emits a TA-Lib-compatible signed series aligned with the
//! input table: +100 at bars where the bullish form completes, −100 for
//! the bearish form, 0 elsewhere. Body/shadow thresholds are fractions of
//! the bar's full range.

use crate::domain::OhlcvTable;

/// Body must be at most this fraction of the range to count as "short".
const BODY_SHORT_FACTOR: f64 = 0.3;
/// Body must be at least this fraction of the range to count as "long".
const BODY_LONG_FACTOR: f64 = 0.6;
/// A doji body is at most this fraction of the range.
const DOJI_BODY_FACTOR: f64 = 0.1;
/// A "long" shadow is at least twice the body.
const SHADOW_LONG_RATIO: f64 = 2.0;

fn body(t: &OhlcvTable, i: usize) -> f64 {
    (t.close[i] - t.open[i]).abs()
}

fn range(t: &OhlcvTable, i: usize) -> f64 {
    t.high[i] - t.low[i]
}

fn upper_shadow(t: &OhlcvTable, i: usize) -> f64 {
    t.high[i] - t.open[i].max(t.close[i])
}

fn lower_shadow(t: &OhlcvTable, i: usize) -> f64 {
    t.open[i].min(t.close[i]) - t.low[i]
}

fn is_white(t: &OhlcvTable, i: usize) -> bool {
    t.close[i] > t.open[i]
}

fn is_black(t: &OhlcvTable, i: usize) -> bool {
    t.close[i] < t.open[i]
}

fn is_doji_bar(t: &OhlcvTable, i: usize) -> bool {
    let r = range(t, i);
    r > 0.0 && body(t, i) <= r * DOJI_BODY_FACTOR
}

fn is_long_body(t: &OhlcvTable, i: usize) -> bool {
    let r = range(t, i);
    r > 0.0 && body(t, i) >= r * BODY_LONG_FACTOR
}

fn is_short_body(t: &OhlcvTable, i: usize) -> bool {
    let r = range(t, i);
    r > 0.0 && body(t, i) <= r * BODY_SHORT_FACTOR
}

fn midpoint(t: &OhlcvTable, i: usize) -> f64 {
    (t.open[i] + t.close[i]) / 2.0
}

/// Doji: open ≈ close. Neutral, flagged +100.
pub fn doji(t: &OhlcvTable) -> Vec<i32> {
    (0..t.len()).map(|i| if is_doji_bar(t, i) { 100 } else { 0 }).collect()
}

/// Hammer: short body near the top, lower shadow at least twice the body.
/// Bullish after a down move.
pub fn hammer(t: &OhlcvTable) -> Vec<i32> {
    hammer_shape(t, true)
}

/// Hanging man: the hammer shape appearing after an up move. Bearish.
pub fn hanging_man(t: &OhlcvTable) -> Vec<i32> {
    hammer_shape(t, false)
}

fn hammer_shape(t: &OhlcvTable, bullish: bool) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 1..n {
        let b = body(t, i);
        if b == 0.0 || !is_short_body(t, i) {
            continue;
        }
        if lower_shadow(t, i) < b * SHADOW_LONG_RATIO || upper_shadow(t, i) > b {
            continue;
        }
        // Trend context: prior close relative to this bar's midpoint.
        let after_down = t.close[i - 1] > midpoint(t, i);
        if bullish && after_down {
            out[i] = 100;
        } else if !bullish && !after_down {
            out[i] = -100;
        }
    }
    out
}

/// Engulfing: the second body fully engulfs the first, opposite color.
/// +100 bullish, −100 bearish.
pub fn engulfing(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 1..n {
        if is_black(t, i - 1)
            && is_white(t, i)
            && t.open[i] <= t.close[i - 1]
            && t.close[i] >= t.open[i - 1]
            && body(t, i) > body(t, i - 1)
        {
            out[i] = 100;
        } else if is_white(t, i - 1)
            && is_black(t, i)
            && t.open[i] >= t.close[i - 1]
            && t.close[i] <= t.open[i - 1]
            && body(t, i) > body(t, i - 1)
        {
            out[i] = -100;
        }
    }
    out
}

/// Harami: a short body contained inside the previous long body,
/// opposite color. +100 bullish, −100 bearish.
pub fn harami(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 1..n {
        if !is_long_body(t, i - 1) || !is_short_body(t, i) {
            continue;
        }
        let prev_top = t.open[i - 1].max(t.close[i - 1]);
        let prev_bot = t.open[i - 1].min(t.close[i - 1]);
        let inside = t.open[i] < prev_top
            && t.open[i] > prev_bot
            && t.close[i] < prev_top
            && t.close[i] > prev_bot;
        if !inside {
            continue;
        }
        if is_black(t, i - 1) {
            out[i] = 100;
        } else if is_white(t, i - 1) {
            out[i] = -100;
        }
    }
    out
}

/// Piercing line: a white bar opening below the prior black bar's low and
/// closing above its body midpoint. Bullish.
pub fn piercing_line(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 1..n {
        if is_black(t, i - 1)
            && is_long_body(t, i - 1)
            && is_white(t, i)
            && t.open[i] < t.low[i - 1]
            && t.close[i] > midpoint(t, i - 1)
            && t.close[i] < t.open[i - 1]
        {
            out[i] = 100;
        }
    }
    out
}

/// Dark cloud cover: a black bar opening above the prior white bar's high
/// and closing below its body midpoint. Bearish.
pub fn dark_cloud_cover(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 1..n {
        if is_white(t, i - 1)
            && is_long_body(t, i - 1)
            && is_black(t, i)
            && t.open[i] > t.high[i - 1]
            && t.close[i] < midpoint(t, i - 1)
            && t.close[i] > t.open[i - 1]
        {
            out[i] = -100;
        }
    }
    out
}

/// Morning star: long black, short body gapping down, then a white bar
/// closing above the first body's midpoint. Bullish.
pub fn morning_star(t: &OhlcvTable) -> Vec<i32> {
    star(t, true)
}

/// Evening star: the bearish mirror of the morning star.
pub fn evening_star(t: &OhlcvTable) -> Vec<i32> {
    star(t, false)
}

fn star(t: &OhlcvTable, bullish: bool) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 2..n {
        let first_ok = if bullish {
            is_black(t, i - 2) && is_long_body(t, i - 2)
        } else {
            is_white(t, i - 2) && is_long_body(t, i - 2)
        };
        if !first_ok || !is_short_body(t, i - 1) {
            continue;
        }
        let star_top = t.open[i - 1].max(t.close[i - 1]);
        let star_bot = t.open[i - 1].min(t.close[i - 1]);
        if bullish {
            let gapped = star_top < t.close[i - 2];
            if gapped && is_white(t, i) && t.close[i] > midpoint(t, i - 2) {
                out[i] = 100;
            }
        } else {
            let gapped = star_bot > t.close[i - 2];
            if gapped && is_black(t, i) && t.close[i] < midpoint(t, i - 2) {
                out[i] = -100;
            }
        }
    }
    out
}

/// Three white soldiers: three consecutive long white bars, each opening
/// within the prior body and closing higher. Bullish.
pub fn three_white_soldiers(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 2..n {
        let all_white = (0..3).all(|k| is_white(t, i - k) && is_long_body(t, i - k));
        if !all_white {
            continue;
        }
        let stacked = t.close[i] > t.close[i - 1] && t.close[i - 1] > t.close[i - 2];
        let opens_inside = t.open[i] > t.open[i - 1]
            && t.open[i] < t.close[i - 1]
            && t.open[i - 1] > t.open[i - 2]
            && t.open[i - 1] < t.close[i - 2];
        if stacked && opens_inside {
            out[i] = 100;
        }
    }
    out
}

/// Three black crows: three consecutive long black bars, each opening
/// within the prior body and closing lower. Bearish.
pub fn three_black_crows(t: &OhlcvTable) -> Vec<i32> {
    let n = t.len();
    let mut out = vec![0; n];
    for i in 2..n {
        let all_black = (0..3).all(|k| is_black(t, i - k) && is_long_body(t, i - k));
        if !all_black {
            continue;
        }
        let stacked = t.close[i] < t.close[i - 1] && t.close[i - 1] < t.close[i - 2];
        let opens_inside = t.open[i] < t.open[i - 1]
            && t.open[i] > t.close[i - 1]
            && t.open[i - 1] < t.open[i - 2]
            && t.open[i - 1] > t.close[i - 2];
        if stacked && opens_inside {
            out[i] = -100;
        }
    }
    out
}
