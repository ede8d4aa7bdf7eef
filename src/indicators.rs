use crate::error::{AnalyticsError, AnalyticsResult};
use serde::Serialize;

// ──────────────────────────────────────────────────────────────────────────────
// Series Types
// ──────────────────────────────────────────────────────────────────────────────

/// Indicator values aligned index-for-index with the input prices.
///
/// `None` marks positions where the lookback window is not yet satisfied;
/// it is never conflated with a computed `0.0`.
pub type IndicatorSeries = Vec<Option<f64>>;

/// Simple daily returns, same length as the price series, first element 0.
pub type ReturnSeries = Vec<f64>;

/// MACD line plus its signal line.
///
/// The signal line is an EMA over the MACD line with undefined entries
/// removed, so `signal_line[j]` belongs to price index `signal_offset + j`.
#[derive(Clone, Debug, Serialize)]
pub struct MacdSeries {
    pub macd_line: IndicatorSeries,
    pub signal_line: IndicatorSeries,
    pub signal_offset: usize,
}

impl MacdSeries {
    /// Re-expands the compacted signal line onto the price timeline.
    pub fn aligned_signal(&self) -> IndicatorSeries {
        let mut aligned = vec![None; self.macd_line.len()];
        for (j, value) in self.signal_line.iter().enumerate() {
            if let Some(slot) = aligned.get_mut(self.signal_offset + j) {
                *slot = *value;
            }
        }
        aligned
    }

    pub fn latest_macd(&self) -> Option<f64> {
        latest(&self.macd_line)
    }

    pub fn latest_signal(&self) -> Option<f64> {
        latest(&self.signal_line)
    }
}

/// Last element of a series, if it is defined.
pub fn latest(series: &IndicatorSeries) -> Option<f64> {
    series.last().copied().flatten()
}

fn check_window(prices: &[f64], period: usize) -> AnalyticsResult<()> {
    if period == 0 {
        return Err(AnalyticsError::InvalidPeriod(period));
    }
    if prices.len() < period {
        return Err(AnalyticsError::insufficient(period, prices.len()));
    }
    Ok(())
}

fn window_mean(window: &[f64]) -> f64 {
    window.iter().sum::<f64>() / window.len() as f64
}

// ──────────────────────────────────────────────────────────────────────────────
// Moving Averages
// ──────────────────────────────────────────────────────────────────────────────

/// Simple moving average over a trailing window of `period` closes.
pub fn sma(prices: &[f64], period: usize) -> AnalyticsResult<IndicatorSeries> {
    check_window(prices, period)?;

    let mut out = vec![None; period - 1];
    out.extend(prices.windows(period).map(|w| Some(window_mean(w))));
    Ok(out)
}

/// Exponential moving average, seeded with the SMA of the first `period` closes.
///
/// Multiplier is `2 / (period + 1)`. Each value depends on its predecessor,
/// so this is a strict left-to-right scan.
pub fn ema(prices: &[f64], period: usize) -> AnalyticsResult<IndicatorSeries> {
    check_window(prices, period)?;

    let multiplier = 2.0 / (period as f64 + 1.0);
    let seed = window_mean(&prices[..period]);

    let mut out = Vec::with_capacity(prices.len());
    out.resize(period - 1, None);
    out.push(Some(seed));

    let mut prev = seed;
    for &price in &prices[period..] {
        prev = (price - prev) * multiplier + prev;
        out.push(Some(prev));
    }

    Ok(out)
}

// ──────────────────────────────────────────────────────────────────────────────
// Oscillators
// ──────────────────────────────────────────────────────────────────────────────

/// Relative Strength Index from simple (not Wilder-smoothed) averages of the
/// trailing `period` gains and losses.
///
/// Output is aligned with `prices`: index 0 has no prior close and the first
/// defined value sits at index `period`. A window with no losses saturates at
/// 100; a window with neither gains nor losses reads 50.
pub fn rsi(prices: &[f64], period: usize) -> AnalyticsResult<IndicatorSeries> {
    if period == 0 {
        return Err(AnalyticsError::InvalidPeriod(period));
    }
    if prices.len() < period + 1 {
        return Err(AnalyticsError::insufficient(period + 1, prices.len()));
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = prices
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let mut out = vec![None; period];
    for end in period..=gains.len() {
        let avg_gain = window_mean(&gains[end - period..end]);
        let avg_loss = window_mean(&losses[end - period..end]);
        out.push(Some(rsi_value(avg_gain, avg_loss)));
    }

    Ok(out)
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD with a signal line computed over the compacted MACD values.
pub fn macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> AnalyticsResult<MacdSeries> {
    if fast == 0 || signal == 0 {
        return Err(AnalyticsError::InvalidPeriod(0));
    }
    if fast >= slow {
        return Err(AnalyticsError::InvalidPeriod(fast));
    }

    let ema_fast = ema(prices, fast)?;
    let ema_slow = ema(prices, slow)?;

    let macd_line: IndicatorSeries = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    let signal_offset = macd_line.iter().position(Option::is_some).unwrap_or(macd_line.len());
    let compacted: Vec<f64> = macd_line.iter().flatten().copied().collect();

    let signal_line = ema(&compacted, signal).map_err(|e| match e {
        AnalyticsError::InsufficientData { .. } => {
            AnalyticsError::insufficient(slow + signal - 1, prices.len())
        }
        other => other,
    })?;

    Ok(MacdSeries {
        macd_line,
        signal_line,
        signal_offset,
    })
}

// ──────────────────────────────────────────────────────────────────────────────
// Returns
// ──────────────────────────────────────────────────────────────────────────────

/// Simple day-over-day returns; element 0 is 0 by definition.
///
/// A zero or non-finite previous close is a degenerate input, not a NaN.
pub fn daily_returns(prices: &[f64]) -> AnalyticsResult<ReturnSeries> {
    if prices.is_empty() {
        return Err(AnalyticsError::insufficient(1, 0));
    }
    if let Some(idx) = prices.iter().position(|p| !p.is_finite()) {
        return Err(AnalyticsError::degenerate(format!("non-finite price at index {}", idx)));
    }

    let mut out = Vec::with_capacity(prices.len());
    out.push(0.0);
    for (i, w) in prices.windows(2).enumerate() {
        if w[0] == 0.0 {
            return Err(AnalyticsError::degenerate(format!("zero price at index {}", i)));
        }
        out.push((w[1] - w[0]) / w[0]);
    }

    Ok(out)
}
