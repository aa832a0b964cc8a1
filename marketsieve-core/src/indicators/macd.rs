//! Moving Average Convergence Divergence (MACD).
//!
//! MACD line = EMA(fast) - EMA(slow); signal line = EMA(signal) of the
//! MACD line; histogram = MACD - signal. Defaults 12/26/9.

use super::ema::ema;

/// The three MACD series, same length as the input, NaN-padded.
#[derive(Debug, Clone)]
pub struct Macd {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD of `closes` with the given periods.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal_period: usize) -> Macd {
    let n = closes.len();
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);

    let mut macd_line = vec![f64::NAN; n];
    for i in 0..n {
        if !fast_ema[i].is_nan() && !slow_ema[i].is_nan() {
            macd_line[i] = fast_ema[i] - slow_ema[i];
        }
    }

    // Signal is an EMA of the valid portion of the MACD line; the front
    // padding is re-applied so all three series stay index-aligned.
    let first_valid = macd_line.iter().position(|v| !v.is_nan());
    let mut signal = vec![f64::NAN; n];
    if let Some(start) = first_valid {
        let tail_signal = ema(&macd_line[start..], signal_period);
        for (i, v) in tail_signal.into_iter().enumerate() {
            signal[start + i] = v;
        }
    }

    let mut histogram = vec![f64::NAN; n];
    for i in 0..n {
        if !macd_line[i].is_nan() && !signal[i].is_nan() {
            histogram[i] = macd_line[i] - signal[i];
        }
    }

    Macd {
        macd: macd_line,
        signal,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn macd_constant_series_is_zero() {
        let closes = vec![100.0; 60];
        let m = macd(&closes, 12, 26, 9);
        assert_approx(m.macd[59], 0.0, DEFAULT_EPSILON);
        assert_approx(m.signal[59], 0.0, DEFAULT_EPSILON);
        assert_approx(m.histogram[59], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn macd_uptrend_is_positive() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let m = macd(&closes, 12, 26, 9);
        assert!(m.macd[79] > 0.0);
        assert!(m.signal[79] > 0.0);
    }

    #[test]
    fn macd_histogram_is_difference() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64).sin() * 5.0).collect();
        let m = macd(&closes, 12, 26, 9);
        for i in 0..80 {
            if !m.histogram[i].is_nan() {
                assert_approx(m.histogram[i], m.macd[i] - m.signal[i], DEFAULT_EPSILON);
            }
        }
    }

    #[test]
    fn macd_short_input_all_nan() {
        let m = macd(&[1.0, 2.0, 3.0], 12, 26, 9);
        assert!(m.macd.iter().all(|v| v.is_nan()));
        assert!(m.signal.iter().all(|v| v.is_nan()));
        assert!(m.histogram.iter().all(|v| v.is_nan()));
    }
}
