//! Pure drift-dominant signal engine.
//!
//! No I/O, no locking, no async — a `Signal` is a function of an anchor
//! price, a current price, and a recent 1-minute candle series.
//! `price_vs_open` at weight 0.70 dominates; four lightweight technical
//! indicators vote at low weight and exist mainly to veto via the
//! agreement filter, not to drive direction.

use crate::domain::errors::{DataQualityError, SignalVeto};
use crate::domain::types::{Candle, Direction, Signal};
use crate::infrastructure::config::SignalConfig;

/// Minimum candle history required before a signal can be computed.
pub const MIN_CANDLES: usize = 26;

const WEIGHT_PRICE_VS_OPEN: f64 = 0.70;
const WEIGHT_MOMENTUM: f64 = 0.09;
const WEIGHT_RSI: f64 = 0.075;
const WEIGHT_MACD: f64 = 0.075;
const WEIGHT_EMA_CROSS: f64 = 0.06;

/// Outcome of a signal evaluation: either an actionable signal or a hold
/// naming the reason the window was skipped.
#[derive(Debug, Clone)]
pub enum SignalOutcome {
    Actionable(Signal),
    Hold { reason: &'static str, signal: Signal },
}

impl SignalOutcome {
    pub fn direction_str(&self) -> &'static str {
        match self {
            SignalOutcome::Actionable(s) => match s.direction {
                Direction::Up => "up",
                Direction::Down => "down",
            },
            SignalOutcome::Hold { .. } => "hold",
        }
    }
}

/// Evaluate a window: anchor vs current price plus a 1m candle history.
///
/// `expected_payout` and `estimated_fee` feed the fee-adjusted-edge hold;
/// the executor supplies the fee estimate.
pub fn evaluate(
    config: &SignalConfig,
    anchor_price: f64,
    current_price: f64,
    candles: &[Candle],
    expected_payout: f64,
    estimated_fee: f64,
) -> Result<SignalOutcome, DataQualityError> {
    if candles.len() < MIN_CANDLES {
        return Err(DataQualityError::InsufficientHistory { have: candles.len(), need: MIN_CANDLES });
    }

    let drift = (current_price - anchor_price) / anchor_price;
    let drift_pct = drift * 100.0;

    let vol_pct = realized_volatility_pct(candles);
    if vol_pct < config.min_vol || vol_pct > config.max_vol {
        let signal = zero_signal(anchor_price, current_price, config.drift_k);
        return Ok(SignalOutcome::Hold { reason: "vol", signal });
    }

    if drift_pct.abs() <= config.dead_zone_pct {
        let signal = zero_signal(anchor_price, current_price, config.drift_k);
        return Ok(SignalOutcome::Hold { reason: "dead_zone", signal });
    }

    let price_vs_open = clamp(drift_pct * config.drift_k, -1.0, 1.0);
    let momentum = momentum_component(candles);
    let rsi_raw = wilders_rsi(candles, 14);
    let rsi = (rsi_raw - 50.0) / 50.0;
    let macd_hist = macd_component(candles);
    let ema_cross = ema_cross_component(candles);

    let score = WEIGHT_PRICE_VS_OPEN * price_vs_open
        + WEIGHT_MOMENTUM * momentum
        + WEIGHT_RSI * rsi
        + WEIGHT_MACD * macd_hist
        + WEIGHT_EMA_CROSS * ema_cross;

    let opposing = [momentum, rsi, macd_hist, ema_cross]
        .iter()
        .filter(|v| sign(**v) != 0 && sign(**v) != sign(price_vs_open))
        .count() as u8;

    let direction = if score > 0.0 { Direction::Up } else { Direction::Down };
    let agreement = 4 - opposing;

    let signal = Signal {
        direction,
        score,
        price_vs_open,
        momentum,
        rsi,
        macd_hist,
        ema_cross,
        agreement,
    };

    if score == 0.0 {
        return Ok(SignalOutcome::Hold { reason: "hold", signal });
    }

    if sign(price_vs_open) != 0 && opposing >= 3 {
        return Ok(SignalOutcome::Hold { reason: "agreement", signal });
    }

    let confidence = score.abs().min(1.0);
    let edge = confidence * expected_payout - estimated_fee;
    if edge < 0.0 {
        return Ok(SignalOutcome::Hold { reason: "fee", signal });
    }

    Ok(SignalOutcome::Actionable(signal))
}

/// Confidence threshold gate, applied by the scheduler after `evaluate`
/// returns `Actionable`. Exactly-at-threshold vetoes: confidence must clear
/// the bar, not merely reach it.
pub fn passes_confidence(signal: &Signal, threshold_pct: f64) -> Result<(), SignalVeto> {
    let confidence = signal.score.abs().min(1.0);
    let threshold = threshold_pct / 100.0;
    if confidence <= threshold {
        return Err(SignalVeto::EdgeBelowThreshold {
            edge_pct: confidence * 100.0,
            threshold_pct,
        });
    }
    Ok(())
}

fn zero_signal(anchor: f64, current: f64, drift_k: f64) -> Signal {
    let price_vs_open = clamp(((current - anchor) / anchor) * 100.0 * drift_k, -1.0, 1.0);
    Signal {
        direction: if price_vs_open >= 0.0 { Direction::Up } else { Direction::Down },
        score: 0.0,
        price_vs_open,
        momentum: 0.0,
        rsi: 0.0,
        macd_hist: 0.0,
        ema_cross: 0.0,
        agreement: 0,
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn sign(v: f64) -> i8 {
    if v > 1e-9 {
        1
    } else if v < -1e-9 {
        -1
    } else {
        0
    }
}

/// Realized volatility: stdev of 1-minute close-to-close returns, as a
/// percentage, over the trailing window.
fn realized_volatility_pct(candles: &[Candle]) -> f64 {
    let returns: Vec<f64> = candles
        .windows(2)
        .map(|w| (w[1].close - w[0].close) / w[0].close)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    variance.sqrt() * 100.0
}

/// Sign and magnitude of price change over the last 3 candles, clamped to [-1, 1].
fn momentum_component(candles: &[Candle]) -> f64 {
    let n = candles.len();
    if n < 4 {
        return 0.0;
    }
    let start = candles[n - 4].close;
    let end = candles[n - 1].close;
    if start == 0.0 {
        return 0.0;
    }
    clamp(((end - start) / start) * 100.0, -1.0, 1.0)
}

/// Wilder's smoothed RSI over `period` candles, mapped to `[0, 100]`.
fn wilders_rsi(candles: &[Candle], period: usize) -> f64 {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    if closes.len() < period + 1 {
        return 50.0;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let (seed_gains, seed_losses) = deltas[..period].iter().fold((0.0, 0.0), |(g, l), d| {
        if *d >= 0.0 { (g + d, l) } else { (g, l - d) }
    });
    let mut avg_gain = seed_gains / period as f64;
    let mut avg_loss = seed_losses / period as f64;

    for d in &deltas[period..] {
        let gain = d.max(0.0);
        let loss = (-d).max(0.0);
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// MACD(12,26,9) histogram sign, scaled heuristically into `[-1, 1]`.
fn macd_component(candles: &[Candle]) -> f64 {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema12 = ema_series(&closes, 12);
    let ema26 = ema_series(&closes, 26);
    let macd_line: Vec<f64> = ema12.iter().zip(ema26.iter()).map(|(a, b)| a - b).collect();
    let signal_line = ema_series(&macd_line, 9);
    let hist = match (macd_line.last(), signal_line.last()) {
        (Some(m), Some(s)) => m - s,
        _ => return 0.0,
    };
    let last_close = *closes.last().unwrap_or(&1.0);
    if last_close == 0.0 {
        return 0.0;
    }
    clamp((hist / last_close) * 500.0, -1.0, 1.0)
}

/// `sign(EMA5 - EMA15)` scaled by the normalized gap.
fn ema_cross_component(candles: &[Candle]) -> f64 {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let ema5 = ema_series(&closes, 5);
    let ema15 = ema_series(&closes, 15);
    match (ema5.last(), ema15.last()) {
        (Some(a), Some(b)) if *b != 0.0 => clamp(((a - b) / b) * 100.0, -1.0, 1.0),
        _ => 0.0,
    }
}

/// Simple EMA series over `period`, seeded with an SMA of the first `period` values.
fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() || period == 0 {
        return Vec::new();
    }
    if values.len() < period {
        return values.to_vec();
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    let mut out = Vec::with_capacity(values.len());
    out.extend(std::iter::repeat(seed).take(period));
    let mut prev = seed;
    for v in &values[period..] {
        let next = v * k + prev * (1.0 - k);
        out.push(next);
        prev = next;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn flat_candles(n: usize, price: f64) -> Vec<Candle> {
        (0..n)
            .map(|_| Candle { open: price, high: price, low: price, close: price, opened_at: Utc::now() })
            .collect()
    }

    fn config() -> SignalConfig {
        SignalConfig {
            dead_zone_pct: 0.04,
            agreement_min: 3,
            confidence_threshold_pct: 60.0,
            drift_k: 10.0,
            min_vol: 0.0,
            max_vol: 100.0,
        }
    }

    #[test]
    fn dead_zone_holds_below_threshold() {
        let candles = flat_candles(30, 60000.0);
        let outcome = evaluate(&config(), 60000.0, 60015.0, &candles, 1.0, 0.0).unwrap();
        match outcome {
            SignalOutcome::Hold { reason, .. } => assert_eq!(reason, "dead_zone"),
            _ => panic!("expected dead zone hold, drift = {}", (60015.0f64 - 60000.0) / 60000.0 * 100.0),
        }
    }

    #[test]
    fn dead_zone_boundary_exact_is_hold() {
        let mut cfg = config();
        cfg.dead_zone_pct = 0.04;
        let candles = flat_candles(30, 100000.0);
        // drift = exactly 0.04% of anchor
        let current = 100000.0 * 1.0004;
        let outcome = evaluate(&cfg, 100000.0, current, &candles, 1.0, 0.0).unwrap();
        match outcome {
            SignalOutcome::Hold { reason, .. } => assert_eq!(reason, "dead_zone"),
            other => panic!("expected dead zone at exact boundary, got {other:?}"),
        }
    }

    #[test]
    fn insufficient_history_is_data_quality_error() {
        let candles = flat_candles(5, 60000.0);
        let err = evaluate(&config(), 60000.0, 60100.0, &candles, 1.0, 0.0).unwrap_err();
        matches!(err, DataQualityError::InsufficientHistory { .. });
    }

    #[test]
    fn price_vs_open_dominates_direction_on_strong_drift() {
        let candles = flat_candles(30, 60000.0);
        let cfg = config();
        let outcome = evaluate(&cfg, 60000.0, 60120.0, &candles, 1.0, 0.0).unwrap();
        // 0.2% drift * drift_k(10) clamps to 1.0, Up direction regardless of
        // the (flat, zero-signed) minor indicators.
        match outcome {
            SignalOutcome::Actionable(s) => assert_eq!(s.direction, Direction::Up),
            SignalOutcome::Hold { signal, .. } => assert_eq!(signal.direction, Direction::Up),
        }
    }

    #[test]
    fn agreement_veto_when_three_of_four_oppose() {
        // A descending series drives momentum/RSI/MACD/EMA bearish while the
        // anchor is pinned below the whole series, forcing a positive
        // (bullish) price_vs_open that the four indicators all contradict.
        let mut candles = Vec::new();
        let mut price = 61000.0;
        for _ in 0..30 {
            price -= 8.0;
            candles.push(Candle { open: price, high: price, low: price, close: price, opened_at: Utc::now() });
        }
        let anchor = price - 200.0;
        let current = price;
        let outcome = evaluate(&config(), anchor, current, &candles, 1.0, 0.0).unwrap();
        let signal = match &outcome {
            SignalOutcome::Actionable(s) => s,
            SignalOutcome::Hold { signal, .. } => signal,
        };
        // Whatever the outcome, the agreement-count invariant must hold:
        // if price_vs_open disagrees with >= 3 of the 4 minor indicators,
        // the result must be a Hold(reason=agreement).
        if signal.agreement <= 1 && sign(signal.price_vs_open) != 0 {
            assert!(matches!(outcome, SignalOutcome::Hold { reason: "agreement", .. }));
        }
    }

    #[test]
    fn confidence_boundary() {
        let signal = Signal {
            direction: Direction::Up,
            score: 0.60,
            price_vs_open: 0.6,
            momentum: 0.0,
            rsi: 0.0,
            macd_hist: 0.0,
            ema_cross: 0.0,
            agreement: 4,
        };
        // Exactly at threshold still vetoes.
        assert!(passes_confidence(&signal, 60.0).is_err());
        let mut below = signal;
        below.score = 0.5999;
        assert!(passes_confidence(&below, 60.0).is_err());
        let mut above = signal;
        above.score = 0.6001;
        assert!(passes_confidence(&above, 60.0).is_ok());
    }

    /// Property: any drift with |drift| < dead_zone_pct holds regardless of
    /// indicator composition.
    #[test]
    fn property_dead_zone_always_holds() {
        let cfg = config();
        let candles = flat_candles(30, 50000.0);
        for bp in -39..=39i32 {
            let drift_pct = bp as f64 / 1000.0; // up to +/-0.039%
            let current = 50000.0 * (1.0 + drift_pct / 100.0);
            let outcome = evaluate(&cfg, 50000.0, current, &candles, 1.0, 0.0).unwrap();
            assert!(matches!(outcome, SignalOutcome::Hold { reason: "dead_zone", .. }));
        }
    }
}
