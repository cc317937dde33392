//! Indicator computations over raw column series.
//!
//! Every function returns a full-length series aligned with its input,
//! NaN-padded over the warmup prefix, oldest→newest. Downstream access
//! treats NaN windows as missing data, so computations never panic on
//! short input: they return an all-NaN series instead.

/// Simple moving average over a window of `period` values.
pub fn sma(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &series[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = window.iter().sum::<f64>() / period as f64;
    }
    result
}

/// Exponential moving average, SMA-seeded at index `period - 1`.
pub fn ema(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    if series[..period].iter().any(|v| v.is_nan()) {
        return result;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = series[..period].iter().sum::<f64>() / period as f64;
    result[period - 1] = prev;
    for i in period..n {
        if series[i].is_nan() {
            return result;
        }
        prev = alpha * series[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Relative Strength Index with Wilder smoothing.
/// avg_loss == 0 → 100; avg_gain == 0 → 0.
pub fn rsi(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return result;
    }
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = series[i] - series[i - 1];
        if change.is_nan() {
            return result;
        }
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    result[period] = rsi_value(avg_gain, avg_loss);

    let alpha = 1.0 / period as f64;
    for i in (period + 1)..n {
        let change = series[i] - series[i - 1];
        if change.is_nan() {
            return result;
        }
        let gain = change.max(0.0);
        let loss = (-change).max(0.0);
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        result[i] = rsi_value(avg_gain, avg_loss);
    }
    result
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Rate of change: percentage move over `period` bars.
pub fn roc(series: &[f64], period: usize) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    for i in period..n {
        let prev = series[i - period];
        let curr = series[i];
        if prev.is_nan() || curr.is_nan() || prev == 0.0 {
            continue;
        }
        result[i] = (curr - prev) / prev * 100.0;
    }
    result
}

/// True range series. First bar: high − low.
pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut tr = vec![f64::NAN; n];
    if n == 0 {
        return tr;
    }
    tr[0] = high[0] - low[0];
    for i in 1..n {
        let h = high[i];
        let l = low[i];
        let pc = close[i - 1];
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            continue;
        }
        tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
    }
    tr
}

/// Wilder smoothing, alpha = 1/period, seeded with the mean of the first
/// `period` consecutive non-NaN values.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    let seed_start = (0..n).find(|&i| {
        i + period <= n && values[i..i + period].iter().all(|v| !v.is_nan())
    });
    let seed_start = match seed_start {
        Some(s) => s,
        None => return result,
    };
    let seed_end = seed_start + period;
    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;
    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            return result;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Average true range: Wilder-smoothed true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(high, low, close), period)
}

fn directional_movement(high: &[f64], low: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = high.len();
    let mut plus_dm = vec![f64::NAN; n];
    let mut minus_dm = vec![f64::NAN; n];
    for i in 1..n {
        if high[i].is_nan() || low[i].is_nan() || high[i - 1].is_nan() || low[i - 1].is_nan() {
            continue;
        }
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        plus_dm[i] = if up > down && up > 0.0 { up } else { 0.0 };
        minus_dm[i] = if down > up && down > 0.0 { down } else { 0.0 };
    }
    (plus_dm, minus_dm)
}

/// +DI: 100 · smoothed(+DM) / smoothed(TR).
pub fn plus_di(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let (plus_dm, _) = directional_movement(high, low);
    di_from_dm(&plus_dm, high, low, close, period)
}

/// −DI: 100 · smoothed(−DM) / smoothed(TR).
pub fn minus_di(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let (_, minus_dm) = directional_movement(high, low);
    di_from_dm(&minus_dm, high, low, close, period)
}

fn di_from_dm(dm: &[f64], high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let smooth_tr = wilder_smooth(&true_range(high, low, close), period);
    let smooth_dm = wilder_smooth(dm, period);
    smooth_dm
        .iter()
        .zip(&smooth_tr)
        .map(|(&dm, &tr)| {
            if dm.is_nan() || tr.is_nan() || tr == 0.0 {
                f64::NAN
            } else {
                100.0 * dm / tr
            }
        })
        .collect()
}

/// Average Directional Index: Wilder-smoothed DX.
pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let pdi = plus_di(high, low, close, period);
    let mdi = minus_di(high, low, close, period);
    let dx: Vec<f64> = pdi
        .iter()
        .zip(&mdi)
        .map(|(&p, &m)| {
            if p.is_nan() || m.is_nan() {
                f64::NAN
            } else if p + m == 0.0 {
                0.0
            } else {
                100.0 * (p - m).abs() / (p + m)
            }
        })
        .collect();
    wilder_smooth(&dx, period)
}

/// Aroon Up: bars since the window max, scaled to [0, 100].
pub fn aroon_up(series: &[f64], period: usize) -> Vec<f64> {
    aroon(series, period, true)
}

/// Aroon Down: bars since the window min, scaled to [0, 100].
pub fn aroon_down(series: &[f64], period: usize) -> Vec<f64> {
    aroon(series, period, false)
}

fn aroon(series: &[f64], period: usize, up: bool) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return result;
    }
    for i in period..n {
        let window = &series[i - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        // Most recent extreme wins ties.
        let mut best = if up { f64::NEG_INFINITY } else { f64::INFINITY };
        let mut best_offset = 0;
        for (j, &v) in window.iter().enumerate() {
            let better = if up { v >= best } else { v <= best };
            if better {
                best = v;
                best_offset = j;
            }
        }
        let bars_since = period - best_offset;
        result[i] = 100.0 * (period - bars_since) as f64 / period as f64;
    }
    result
}

/// Commodity Channel Index over typical price (H+L+C)/3.
pub fn cci(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    let tp: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    for i in (period - 1)..n {
        let window = &tp[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let mean_dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        if mean_dev == 0.0 {
            result[i] = 0.0;
        } else {
            result[i] = (tp[i] - mean) / (0.015 * mean_dev);
        }
    }
    result
}

/// MACD line: EMA(fast) − EMA(slow).
pub fn macd(series: &[f64], slow: usize, fast: usize) -> Vec<f64> {
    let fast_ema = ema(series, fast);
    let slow_ema = ema(series, slow);
    fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(&f, &s)| f - s)
        .collect()
}

/// MACD signal line: EMA(signal) of the MACD line.
pub fn macd_signal(series: &[f64], slow: usize, fast: usize, signal: usize) -> Vec<f64> {
    let line = macd(series, slow, fast);
    // Strip the NaN warmup so the signal EMA seeds on real values.
    let first_valid = match line.iter().position(|v| !v.is_nan()) {
        Some(i) => i,
        None => return line,
    };
    let smoothed = ema(&line[first_valid..], signal);
    let mut result = vec![f64::NAN; first_valid];
    result.extend(smoothed);
    result
}

/// MACD histogram: MACD line − signal line.
pub fn macd_histogram(series: &[f64], slow: usize, fast: usize, signal: usize) -> Vec<f64> {
    let line = macd(series, slow, fast);
    let sig = macd_signal(series, slow, fast, signal);
    line.iter().zip(&sig).map(|(&l, &s)| l - s).collect()
}

#[derive(Debug, Clone, Copy)]
enum BollingerBand {
    Upper,
    Middle,
    Lower,
}

fn bollinger(series: &[f64], period: usize, multiplier: f64, band: BollingerBand) -> Vec<f64> {
    let n = series.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &series[i + 1 - period..=i];
        if window.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        result[i] = match band {
            BollingerBand::Middle => mean,
            BollingerBand::Upper | BollingerBand::Lower => {
                let variance =
                    window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / period as f64;
                let offset = multiplier * variance.sqrt();
                match band {
                    BollingerBand::Upper => mean + offset,
                    _ => mean - offset,
                }
            }
        };
    }
    result
}

/// Upper Bollinger band: SMA + multiplier · population stddev.
pub fn bollinger_upper(series: &[f64], period: usize, multiplier: f64) -> Vec<f64> {
    bollinger(series, period, multiplier, BollingerBand::Upper)
}

/// Lower Bollinger band: SMA − multiplier · population stddev.
pub fn bollinger_lower(series: &[f64], period: usize, multiplier: f64) -> Vec<f64> {
    bollinger(series, period, multiplier, BollingerBand::Lower)
}

/// Median Bollinger band: the SMA itself (multiplier unused).
pub fn bollinger_middle(series: &[f64], period: usize) -> Vec<f64> {
    bollinger(series, period, 0.0, BollingerBand::Middle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn sma_basic() {
        let s = [10.0, 11.0, 12.0, 13.0, 14.0];
        let result = sma(&s, 3);
        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_approx(result[2], 11.0);
        assert_approx(result[4], 13.0);
    }

    #[test]
    fn sma_too_short_is_all_nan() {
        let result = sma(&[1.0, 2.0], 5);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ema_seeds_with_sma() {
        let s = [10.0, 20.0, 30.0, 40.0];
        let result = ema(&s, 3);
        assert!(result[1].is_nan());
        assert_approx(result[2], 20.0);
        // alpha = 0.5: 0.5*40 + 0.5*20 = 30
        assert_approx(result[3], 30.0);
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let s: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let result = rsi(&s, 14);
        assert_approx(result[19], 100.0);
    }

    #[test]
    fn rsi_all_losses_is_0() {
        let s: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let result = rsi(&s, 14);
        assert_approx(result[19], 0.0);
    }

    #[test]
    fn roc_percentage_change() {
        let s = [100.0, 101.0, 110.0];
        let result = roc(&s, 2);
        assert!(result[1].is_nan());
        assert_approx(result[2], 10.0);
    }

    #[test]
    fn atr_constant_range() {
        let high = vec![12.0; 10];
        let low = vec![10.0; 10];
        let close = vec![11.0; 10];
        let result = atr(&high, &low, &close, 3);
        // TR is 2.0 everywhere, smoothing keeps it at 2.0.
        assert_approx(result[9], 2.0);
    }

    #[test]
    fn plus_di_dominates_in_uptrend() {
        let n = 30;
        let high: Vec<f64> = (0..n).map(|i| 102.0 + i as f64).collect();
        let low: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        let close: Vec<f64> = (0..n).map(|i| 101.0 + i as f64).collect();
        let pdi = plus_di(&high, &low, &close, 5);
        let mdi = minus_di(&high, &low, &close, 5);
        assert!(pdi[n - 1] > mdi[n - 1]);
    }

    #[test]
    fn adx_stays_in_bounds() {
        let high: Vec<f64> = (0..40).map(|i| 105.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let low: Vec<f64> = high.iter().map(|h| h - 4.0).collect();
        let close: Vec<f64> = high.iter().map(|h| h - 2.0).collect();
        for v in adx(&high, &low, &close, 5) {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn aroon_up_100_at_new_high() {
        let s: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let result = aroon_up(&s, 5);
        assert_approx(result[9], 100.0);
    }

    #[test]
    fn aroon_down_100_at_new_low() {
        let s: Vec<f64> = (0..10).map(|i| 100.0 - i as f64).collect();
        let result = aroon_down(&s, 5);
        assert_approx(result[9], 100.0);
    }

    #[test]
    fn cci_zero_on_flat_series() {
        let flat = vec![50.0; 10];
        let result = cci(&flat, &flat, &flat, 5);
        assert_approx(result[9], 0.0);
    }

    #[test]
    fn macd_line_is_fast_minus_slow_ema() {
        let s: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let line = macd(&s, 26, 12);
        let expected = ema(&s, 12)[59] - ema(&s, 26)[59];
        assert_approx(line[59], expected);
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let s: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 10.0).collect();
        let line = macd(&s, 26, 12);
        let sig = macd_signal(&s, 26, 12, 9);
        let hist = macd_histogram(&s, 26, 12, 9);
        assert_approx(hist[79], line[79] - sig[79]);
    }

    #[test]
    fn bollinger_bands_bracket_the_mean() {
        let s: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64).sin() * 3.0).collect();
        let upper = bollinger_upper(&s, 20, 2.0);
        let middle = bollinger_middle(&s, 20);
        let lower = bollinger_lower(&s, 20, 2.0);
        assert!(upper[29] > middle[29]);
        assert!(lower[29] < middle[29]);
    }

    #[test]
    fn bollinger_flat_series_collapses() {
        let s = vec![42.0; 25];
        let upper = bollinger_upper(&s, 20, 2.0);
        let lower = bollinger_lower(&s, 20, 2.0);
        assert_approx(upper[24], 42.0);
        assert_approx(lower[24], 42.0);
    }
}
